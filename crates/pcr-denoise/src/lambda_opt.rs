// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::condat::tv1d_denoise_into;
use pcr_core::{PcrError, count_jumps};

/// Threshold above which a first difference counts as a jump.
pub const JUMP_THRESHOLD: f64 = 1e-7;

/// Per-step shrink factor of the trial fraction in the steepest-descent
/// search.
const SHRINK_FACTOR: f64 = 5.0;

/// Iteration bound shared by both search strategies.
const MAX_ITERS: usize = 50;

/// Strategy for picking the operating point on the jumps-vs-lambda curve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LambdaSearch {
    /// Walk `f = 1, 1/2, 1/10, ...` downwards until the local slope of the
    /// jump count exceeds the initial slope. The shipped default.
    #[default]
    SteepestDescent,
    /// Recursive midpoint search over `[lambda_min, lambda_max]`, descending
    /// into the half with the steeper jump-count slope.
    Bisection { lambda_min: f64 },
}

/// Reusable search state: the noisy input plus scratch buffers for the
/// denoised signal and its first differences, so the inner TV1D loop does
/// not reallocate.
pub struct LambdaOptimizer<'a> {
    noisy: &'a [f64],
    denoised: Vec<f64>,
    diffs: Vec<f64>,
}

impl<'a> LambdaOptimizer<'a> {
    pub fn new(noisy: &'a [f64]) -> Self {
        Self {
            noisy,
            denoised: Vec::with_capacity(noisy.len()),
            diffs: Vec::with_capacity(noisy.len().saturating_sub(1)),
        }
    }

    pub fn search(&mut self, lambda_max: f64, strategy: LambdaSearch) -> Result<f64, PcrError> {
        match strategy {
            LambdaSearch::SteepestDescent => self.steepest_descent(lambda_max),
            LambdaSearch::Bisection { lambda_min } => self.bisection(lambda_min, lambda_max),
        }
    }

    /// Steepest-descent search for `lambda_opt = f * lambda_max`.
    pub fn steepest_descent(&mut self, lambda_max: f64) -> Result<f64, PcrError> {
        validate_lambda_bound("lambda_max", lambda_max)?;
        if lambda_max == 0.0 {
            return Ok(0.0);
        }

        let n_samples = self.noisy.len() as f64;

        let f_prev_initial = 1.0;
        let mut f_prev = f_prev_initial;
        let mut n_prev = self.jumps_for_lambda(f_prev * lambda_max)?;
        let mut f = f_prev / 2.0;
        let mut n = self.jumps_for_lambda(f * lambda_max)?;

        let start_slope = (n_samples - n_prev).abs() / (f_prev_initial - 0.0);

        for _ in 0..MAX_ITERS {
            let slope = (n - n_prev).abs() / (f_prev - f);
            if slope > start_slope {
                break;
            }

            f_prev = f;
            n_prev = n;
            f = f_prev / SHRINK_FACTOR;
            n = self.jumps_for_lambda(f * lambda_max)?;
        }

        Ok(f * lambda_max)
    }

    /// Bisection on the slope of the jump count, to a fixed depth.
    pub fn bisection(&mut self, lambda_min: f64, lambda_max: f64) -> Result<f64, PcrError> {
        validate_lambda_bound("lambda_min", lambda_min)?;
        validate_lambda_bound("lambda_max", lambda_max)?;
        if lambda_max == 0.0 {
            return Ok(0.0);
        }
        if lambda_min >= lambda_max {
            return Err(PcrError::invalid_input(format!(
                "bisection requires lambda_min < lambda_max; got [{lambda_min}, {lambda_max}]"
            )));
        }

        let n_min = self.jumps_for_lambda(lambda_min)?;
        let n_max = self.jumps_for_lambda(lambda_max)?;
        self.bisect(lambda_min, lambda_max, n_min, n_max, MAX_ITERS)
    }

    fn bisect(
        &mut self,
        lambda_min: f64,
        lambda_max: f64,
        n_min: f64,
        n_max: f64,
        remaining: usize,
    ) -> Result<f64, PcrError> {
        let pivot = (lambda_min + lambda_max) / 2.0;
        if remaining == 0 {
            return Ok(pivot);
        }

        let n_pivot = self.jumps_for_lambda(pivot)?;
        let lower_slope = slope(n_min, n_pivot, lambda_min, pivot);
        let upper_slope = slope(n_pivot, n_max, pivot, lambda_max);

        if lower_slope > upper_slope {
            self.bisect(lambda_min, pivot, n_min, n_pivot, remaining - 1)
        } else {
            self.bisect(pivot, lambda_max, n_pivot, n_max, remaining - 1)
        }
    }

    /// Denoises at `lambda` and counts the surviving jumps, clipped by the
    /// sample count.
    fn jumps_for_lambda(&mut self, lambda: f64) -> Result<f64, PcrError> {
        tv1d_denoise_into(self.noisy, lambda, &mut self.denoised)?;

        self.diffs.clear();
        self.diffs
            .extend(self.denoised.windows(2).map(|pair| pair[1] - pair[0]));

        let n = count_jumps(&self.diffs, JUMP_THRESHOLD) as f64;
        Ok(n.min(self.noisy.len() as f64))
    }
}

/// Convenience entry point with the shipped default strategy.
pub fn lambda_opt(input: &[f64], lambda_max: f64) -> Result<f64, PcrError> {
    LambdaOptimizer::new(input).steepest_descent(lambda_max)
}

fn slope(n_1: f64, n_2: f64, l_1: f64, l_2: f64) -> f64 {
    ((n_2 - n_1) / (l_2 - l_1)).abs()
}

fn validate_lambda_bound(name: &str, value: f64) -> Result<(), PcrError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PcrError::invalid_input(format!(
            "{name} must be finite and >= 0.0; got {value}"
        )));
    }
    Ok(())
}
