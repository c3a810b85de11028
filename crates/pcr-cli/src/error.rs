// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::PcrError;
use serde::Serialize;
use std::fmt;

/// Exit code for malformed input or command-line usage errors.
pub const EXIT_USAGE: i32 = 1;
/// Exit code for everything else that goes wrong.
pub const EXIT_FAILURE: i32 = 2;

#[derive(Debug)]
pub enum CliError {
    Pcr(PcrError),
    Io {
        context: String,
        source: std::io::Error,
    },
    InvalidInput(String),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Pcr(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Malformed input (bad flags, unreadable or malformed files) exits
    /// with 1; anything else with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_)
            | Self::Io { .. }
            | Self::Pcr(PcrError::InvalidInput(_)) => EXIT_USAGE,
            Self::Pcr(_) => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcr(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pcr(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<PcrError> for CliError {
    fn from(value: PcrError) -> Self {
        Self::Pcr(value)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: String,
}

/// Writes the structured error envelope to stderr.
pub fn emit_structured_error(error: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: error.code(),
            message: error.to_string(),
        },
    };
    match serde_json::to_string(&envelope) {
        Ok(encoded) => eprintln!("{encoded}"),
        Err(_) => eprintln!("{{\"error\":{{\"code\":\"{}\"}}}}", error.code()),
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, EXIT_FAILURE, EXIT_USAGE};
    use pcr_core::PcrError;

    #[test]
    fn usage_errors_exit_with_one() {
        assert_eq!(CliError::invalid_input("bad flag").exit_code(), EXIT_USAGE);
        assert_eq!(
            CliError::from(PcrError::invalid_input("empty data")).exit_code(),
            EXIT_USAGE
        );
    }

    #[test]
    fn engine_failures_exit_with_two() {
        assert_eq!(
            CliError::from(PcrError::non_submodular(-1, 0)).exit_code(),
            EXIT_FAILURE
        );
        assert_eq!(
            CliError::from(PcrError::resource_limit("overflow")).exit_code(),
            EXIT_FAILURE
        );
    }
}
