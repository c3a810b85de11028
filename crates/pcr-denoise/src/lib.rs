// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Exact 1D total-variation denoising (Condat's algorithm) and selection of
//! the regularisation weight: a closed-form `lambda_max` bound and a
//! shape-driven `lambda_opt` search over the jumps-vs-lambda curve.

pub mod condat;
pub mod lambda_max;
pub mod lambda_opt;

pub use condat::{tv1d_denoise, tv1d_denoise_into};
pub use lambda_max::lambda_max;
pub use lambda_opt::{JUMP_THRESHOLD, LambdaOptimizer, LambdaSearch, lambda_opt};
