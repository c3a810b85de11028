// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Error type shared by every crate in the workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PcrError {
    /// Malformed caller input: bad dimensions, negative weights, unknown ids.
    InvalidInput(String),
    /// A pairwise term violated `e00 + e11 <= e01 + e10` with healing off.
    NonSubmodular { b: i64, c: i64 },
    /// Non-finite intermediate values or other numeric degeneracies.
    NumericalIssue(String),
    /// A requested mode or combination this build does not implement.
    NotSupported(String),
    /// Counter or capacity overflow.
    ResourceLimit(String),
}

impl PcrError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn non_submodular(b: i64, c: i64) -> Self {
        Self::NonSubmodular { b, c }
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// Stable machine-readable code for structured error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NonSubmodular { .. } => "non_submodular",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }
}

impl fmt::Display for PcrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::NonSubmodular { b, c } => write!(
                f,
                "pairwise energy is not submodular after reduction: b={b}, c={c}, b+c<0"
            ),
            Self::NumericalIssue(msg) => write!(f, "{msg}"),
            Self::NotSupported(msg) => write!(f, "{msg}"),
            Self::ResourceLimit(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PcrError {}
