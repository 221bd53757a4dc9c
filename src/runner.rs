//! The execution kernel and its leaf components.

pub mod actions;
pub mod config;
pub mod loader;
pub mod mspec;
mod panics;
pub mod shuffle;
pub mod state;
pub mod tags;

pub use actions::{Action, ActionRegistry, Event, Phase, SharedAction};
pub use config::{Config, Mode};
pub use loader::{SpecFn, SpecLoader, Suite};
pub use mspec::MSpec;
pub use state::{RunState, Scope, SpecState, StateStack};
pub use tags::{SpecTag, TagStore};
