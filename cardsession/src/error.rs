// cardsession/src/error.rs

use crate::types::{AccessLevel, CommandKind};
use thiserror::Error;

/// Common error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or out-of-order API usage.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// The card answered a command with an unsuccessful status word.
    #[error("card rejected {command}: status word {sw:#06x}")]
    Command { command: CommandKind, sw: u16 },

    #[error("{command} not permitted {}", level_text(.level))]
    AccessLevelViolation {
        command: CommandKind,
        level: Option<AccessLevel>,
    },

    #[error("security module unavailable: {0}")]
    SamUnavailable(String),

    #[error("session verification failed: {0}")]
    SessionVerification(String),

    #[error("reader i/o error: {0}")]
    Io(String),

    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("reader not found: {0}")]
    ReaderNotFound(String),
}

fn level_text(level: &Option<AccessLevel>) -> String {
    match level {
        Some(level) => format!("under access level {level}"),
        None => "outside a secure session".to_string(),
    }
}

/// Coarse origin of a failure, used by callers to pick a recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Card,
    SecurityModule,
    Configuration,
    Reader,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration(_)
            | Error::InvalidOperand(_)
            | Error::AccessLevelViolation { .. }
            | Error::ReaderNotFound(_) => ErrorCategory::Configuration,
            Error::Command { .. } | Error::InvalidLength { .. } | Error::MalformedResponse(_) => {
                ErrorCategory::Card
            }
            Error::SamUnavailable(_) | Error::SessionVerification(_) => {
                ErrorCategory::SecurityModule
            }
            Error::Io(_) | Error::Timeout { .. } => ErrorCategory::Reader,
        }
    }
}

impl From<iso7816_tlv::TlvError> for Error {
    fn from(error: iso7816_tlv::TlvError) -> Self {
        Error::MalformedResponse(format!("tlv: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
