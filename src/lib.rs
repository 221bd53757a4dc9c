//! mspec: a specification-style test runner.
//!
//! Spec files register nested `describe` scopes of examples with an
//! [`MSpec`] kernel; the kernel runs them with every fault isolated, notifies
//! registered actions at each lifecycle phase, and keeps per-file tag records
//! that let later runs skip or select individual examples.

pub use crate::errors::{Fault, MSpecError};
pub use crate::runner::mspec::MSpec;

pub mod actions;
pub mod cli;
pub mod errors;
pub mod formatters;
pub mod prelude;
pub mod runner;
