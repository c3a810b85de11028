// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::{PcrError, diff};

/// Closed-form upper bound on the useful regularisation range: the smallest
/// `lambda` at which [`crate::tv1d_denoise`] collapses the input to a
/// constant.
///
/// Solves `A z = b` exactly, where `A` is the `(N-1) x (N-1)` tridiagonal
/// `(-1, 2, -1)` matrix and `b` the first difference of the input, using the
/// Rose recurrence, and returns `max_i |z_i|`. Inputs with fewer than two
/// samples, and constant inputs, yield `0.0`.
pub fn lambda_max(input: &[f64]) -> Result<f64, PcrError> {
    for &value in input {
        if !value.is_finite() {
            return Err(PcrError::numerical_issue(format!(
                "lambda_max requires finite samples; got {value}"
            )));
        }
    }
    if input.len() < 2 {
        return Ok(0.0);
    }

    let b = diff(input);
    let nn = b.len();

    let mut s = 0.0;
    for (i, &b_i) in b.iter().enumerate() {
        s += b_i * (i + 1) as f64;
    }
    s /= (nn + 1) as f64;

    let mut z = vec![0.0; nn];
    z[nn - 1] = b[nn - 1] - s;
    for i in (0..nn - 1).rev() {
        z[i] = b[i] + z[i + 1];
    }

    let mut z_max = z[0].abs();
    for i in 1..nn {
        z[i] += z[i - 1];
        z_max = z_max.max(z[i].abs());
    }

    Ok(z_max)
}
