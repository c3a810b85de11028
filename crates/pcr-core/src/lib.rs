// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types for piecewise-constant signal reconstruction: the workspace
//! error enum, the deterministic RNG, sequence and level helpers, lambda
//! weights, and run diagnostics.

pub mod diagnostics;
pub mod error;
pub mod lambdas;
pub mod levels;
pub mod observability;
pub mod rng;
pub mod sequence;

pub use diagnostics::{
    DIAGNOSTICS_SCHEMA_VERSION, EnergyHistory, EnergyTerm, RunDiagnostics,
};
pub use error::PcrError;
pub use lambdas::Lambdas;
pub use levels::{levels_by_count, levels_by_distance};
pub use observability::{BufferedTrace, TraceSink};
pub use rng::StableRng;
pub use sequence::{compress, count_jumps, diff};
