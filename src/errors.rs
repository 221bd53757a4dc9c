//! mspec error handling.
//!
//! Two error types live here:
//!
//! - [`Fault`] is what user spec code raises. It is captured by
//!   [`MSpec::protect`](crate::runner::mspec::MSpec::protect) and attributed to
//!   the running example, never propagated out of the run.
//! - [`MSpecError`] covers the runner's own failure modes (tag file I/O, bad
//!   rewrite patterns, config files). These surface as `miette` diagnostics.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Class name reported for expectation faults.
pub const EXPECTATION_NOT_MET: &str = "ExpectationNotMetError";

// ============================================================================
// FAULT - faults raised by spec code
// ============================================================================

/// A fault raised while running spec code.
///
/// Only [`Fault::ExpectationNotMet`] counts as a *failure*; every other
/// variant is an *error* for reporting purposes.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum Fault {
    #[error("{message}")]
    #[diagnostic(code(mspec::expectation_not_met))]
    ExpectationNotMet {
        message: String,
        trace: Option<String>,
    },
    #[error("{class}: {message}")]
    #[diagnostic(code(mspec::error))]
    Error {
        class: String,
        message: String,
        trace: Option<String>,
    },
    #[error("panic: {message}")]
    #[diagnostic(code(mspec::panic))]
    Panic {
        message: String,
        trace: Option<String>,
    },
}

impl Fault {
    /// An expectation was not met.
    pub fn expectation(message: impl Into<String>) -> Self {
        Fault::ExpectationNotMet {
            message: message.into(),
            trace: capture_trace(),
        }
    }

    /// Any other fault, tagged with a class name.
    pub fn error(class: impl Into<String>, message: impl Into<String>) -> Self {
        Fault::Error {
            class: class.into(),
            message: message.into(),
            trace: capture_trace(),
        }
    }

    /// Wraps an arbitrary error, using its type name as the fault class.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let full = std::any::type_name::<E>();
        let class = full.rsplit("::").next().unwrap_or(full);
        Fault::error(class, err.to_string())
    }

    /// Converts a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::new()
        };
        Fault::Panic {
            message,
            trace: None,
        }
    }

    /// Replaces the captured backtrace.
    pub fn with_trace(mut self, backtrace: impl Into<String>) -> Self {
        match &mut self {
            Fault::ExpectationNotMet { trace, .. }
            | Fault::Error { trace, .. }
            | Fault::Panic { trace, .. } => *trace = Some(backtrace.into()),
        }
        self
    }

    pub fn is_expectation(&self) -> bool {
        matches!(self, Fault::ExpectationNotMet { .. })
    }

    /// The class name shown in reports.
    pub fn class(&self) -> &str {
        match self {
            Fault::ExpectationNotMet { .. } => EXPECTATION_NOT_MET,
            Fault::Error { class, .. } => class,
            Fault::Panic { .. } => "Panic",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Fault::ExpectationNotMet { message, .. }
            | Fault::Error { message, .. }
            | Fault::Panic { message, .. } => message,
        }
    }

    /// The backtrace captured when the fault was built, if backtraces are enabled.
    pub fn backtrace(&self) -> Option<&str> {
        match self {
            Fault::ExpectationNotMet { trace, .. }
            | Fault::Error { trace, .. }
            | Fault::Panic { trace, .. } => trace.as_deref(),
        }
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::error("IOError", err.to_string())
    }
}

impl From<MSpecError> for Fault {
    fn from(err: MSpecError) -> Self {
        Fault::from_error(&err)
    }
}

/// Captures a backtrace regardless of `RUST_BACKTRACE`.
fn capture_trace() -> Option<String> {
    let backtrace = Backtrace::force_capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

// ============================================================================
// MSPEC ERROR - runner failures
// ============================================================================

/// Errors produced by the runner itself rather than by spec code.
#[derive(Debug, Error, Diagnostic)]
pub enum MSpecError {
    #[error("failed to {action} '{}'", .path.display())]
    #[diagnostic(code(mspec::io))]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tag pattern '{pattern}'")]
    #[diagnostic(
        code(mspec::tags::pattern),
        help("tag patterns are regular expressions applied to the spec file path")
    )]
    TagPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid config file '{}'", .path.display())]
    #[diagnostic(code(mspec::config))]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl MSpecError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MSpecError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
