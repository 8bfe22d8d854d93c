use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutCategory {
    Strength,
    Cardio,
    IntervalWorkout,
    Other,
}

impl WorkoutCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutCategory::Strength => "strength",
            WorkoutCategory::Cardio => "cardio",
            WorkoutCategory::IntervalWorkout => "interval_workout",
            WorkoutCategory::Other => "other",
        }
    }
}

impl Display for WorkoutCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkoutCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strength" => Ok(Self::Strength),
            "cardio" => Ok(Self::Cardio),
            "interval_workout" | "interval" | "hiit" => Ok(Self::IntervalWorkout),
            "other" => Ok(Self::Other),
            other => Err(format!("{} is not a supported workout category", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateReading {
    pub bpm: i32,
    pub timestamp: DateTime<Utc>,
}

impl HeartRateReading {
    pub fn new(bpm: i32, timestamp: DateTime<Utc>) -> Self {
        Self { bpm, timestamp }
    }
}

/// A workout recorded on either device.
///
/// `id` is the only key used to recognise the same workout across devices.
/// Once `is_active` is false, `duration_seconds` equals `end_time - start_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub category: WorkoutCategory,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub is_active: bool,
    #[serde(default)]
    pub heart_rate_readings: Vec<HeartRateReading>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<i32>,
    pub calories: i32,
    pub step_count: Option<i32>,
    pub exercise_count: i32,
    pub notes: Option<String>,
}

impl WorkoutSession {
    /// Start a new active session.
    pub fn start(category: WorkoutCategory, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            start_time,
            end_time: None,
            duration_seconds: 0,
            is_active: true,
            heart_rate_readings: Vec::new(),
            avg_heart_rate: None,
            max_heart_rate: None,
            calories: 0,
            step_count: None,
            exercise_count: 0,
            notes: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_calories(mut self, calories: i32) -> Self {
        self.calories = calories;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Append a reading and recompute the aggregates from the full list.
    /// Readings stay ordered by timestamp even when they arrive late.
    pub fn append_reading(&mut self, reading: HeartRateReading) {
        let position = self
            .heart_rate_readings
            .partition_point(|r| r.timestamp <= reading.timestamp);
        self.heart_rate_readings.insert(position, reading);
        self.recompute_heart_rate_aggregates();
    }

    pub fn recompute_heart_rate_aggregates(&mut self) {
        self.avg_heart_rate = average_bpm(&self.heart_rate_readings);
        self.max_heart_rate = self.heart_rate_readings.iter().map(|r| r.bpm).max();
    }

    /// Finalize the session at `end_time`.
    pub fn finish(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
        self.duration_seconds = end_time
            .signed_duration_since(self.start_time)
            .num_seconds()
            .max(0);
        self.is_active = false;
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds)
    }
}

fn average_bpm(readings: &[HeartRateReading]) -> Option<f64> {
    if readings.is_empty() {
        return None;
    }
    let sum: i64 = readings.iter().map(|r| r.bpm as i64).sum();
    Some(sum as f64 / readings.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates_follow_appended_readings() {
        let start = Utc::now();
        let mut session = WorkoutSession::start(WorkoutCategory::Cardio, start);
        for (offset, bpm) in [120, 150, 135].into_iter().enumerate() {
            session.append_reading(HeartRateReading::new(bpm, start + Duration::seconds(offset as i64)));
        }

        assert_eq!(session.avg_heart_rate, Some(135.0));
        assert_eq!(session.max_heart_rate, Some(150));
    }

    #[test]
    fn test_late_reading_is_ordered_by_timestamp() {
        let start = Utc::now();
        let mut session = WorkoutSession::start(WorkoutCategory::Strength, start);
        session.append_reading(HeartRateReading::new(100, start + Duration::seconds(10)));
        session.append_reading(HeartRateReading::new(90, start + Duration::seconds(5)));

        let bpms: Vec<i32> = session.heart_rate_readings.iter().map(|r| r.bpm).collect();
        assert_eq!(bpms, vec![90, 100]);
    }

    #[test]
    fn test_finish_sets_duration_from_bounds() {
        let start = Utc::now();
        let mut session = WorkoutSession::start(WorkoutCategory::IntervalWorkout, start);
        session.finish(start + Duration::minutes(42));

        assert!(!session.is_active);
        assert_eq!(session.duration_seconds, 42 * 60);
        assert_eq!(session.end_time, Some(start + Duration::minutes(42)));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Cardio".parse::<WorkoutCategory>(), Ok(WorkoutCategory::Cardio));
        assert_eq!("interval_workout".parse::<WorkoutCategory>(), Ok(WorkoutCategory::IntervalWorkout));
        assert!("yoga".parse::<WorkoutCategory>().is_err());
    }
}
