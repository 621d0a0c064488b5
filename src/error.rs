//! Error types.

use std::fmt;

use crate::filter::{BoxError, FilterId};

/// The error type returned by the server's fallible operations.
///
/// Application-level outcomes (401, 404, 418, etc.) are expressed as
/// [`Response`](crate::Response) values, usually from a filter's pre-phase,
/// not as `Error`s. This type surfaces infrastructure failures: binding to a
/// port or accepting a connection.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}

/// The step of a filter an error refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "pre-phase",
            Self::After => "post-phase",
        })
    }
}

/// Why a filter chain failed to produce a response.
///
/// A short-circuit is not an error: it is a normal response. Whatever the
/// variant, every filter instance entered before the failure has already been
/// closed when the caller sees this.
#[derive(Debug)]
pub enum ChainError {
    /// The filter broke its contract: its pre-phase finished without
    /// suspending, or its post-phase was requested before its pre-phase
    /// completed.
    ContractViolation { filter: FilterId, phase: Phase },
    /// A filter step returned an error. Outer post-phases do not run.
    Filter {
        filter: FilterId,
        phase: Phase,
        source: BoxError,
    },
    /// The handler failed. No post-phase runs, since there is no response to
    /// post-process.
    Handler(BoxError),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContractViolation { filter, phase: Phase::Before } => {
                write!(f, "filter `{filter}` must suspend at least once")
            }
            Self::ContractViolation { filter, phase: Phase::After } => {
                write!(f, "filter `{filter}` resumed before its pre-phase completed")
            }
            Self::Filter { filter, phase, source } => {
                write!(f, "filter `{filter}` failed in {phase}: {source}")
            }
            Self::Handler(source) => write!(f, "handler failed: {source}"),
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ContractViolation { .. } => None,
            Self::Filter { source, .. } | Self::Handler(source) => Some(&**source),
        }
    }
}
