//! Stock lifecycle actions: counting, timing, filtering, and tagging.
//!
//! Each action is registered with [`register`](tally::TallyAction::register),
//! which wraps it in a shared handle, hooks it into the phases it handles, and
//! hands the handle back so the caller can read its results after the run.

pub mod filters;
pub mod tag;
pub mod tally;
pub mod timer;

pub use filters::{FilterKind, MatchFilter, TagFilter};
pub use tag::{TagAction, TagOp, TagOutcome};
pub use tally::{Tally, TallyAction};
pub use timer::TimerAction;
