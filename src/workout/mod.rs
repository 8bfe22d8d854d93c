pub mod session_merge;

pub use session_merge::{merge_notes, merge_session, merge_session_fields, MergeOutcome};
