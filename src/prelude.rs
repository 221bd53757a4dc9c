//! Everything a spec file or harness binary needs.

pub use crate::actions::{FilterKind, MatchFilter, TagAction, TagFilter, TallyAction, TimerAction};
pub use crate::errors::{Fault, MSpecError};
pub use crate::formatters::DottedFormatter;
pub use crate::runner::{
    Action, Config, Event, Mode, MSpec, Phase, Scope, SharedAction, SpecLoader, SpecState,
    SpecTag, Suite, TagStore,
};
