// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::PcrError;

/// Exact solver for the 1D total-variation regularised least-squares
/// problem
///
/// ```text
/// minimize (1/2) * sum_i (y_i - x_i)^2 + lambda * sum_i |y_{i+1} - y_i|
/// ```
///
/// Single pass, O(N) time, O(1) auxiliary state (Condat's algorithm). The
/// output is written into `output`, which is resized to match the input.
pub fn tv1d_denoise_into(
    input: &[f64],
    lambda: f64,
    output: &mut Vec<f64>,
) -> Result<(), PcrError> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(PcrError::invalid_input(format!(
            "denoising weight lambda must be finite and >= 0.0; got {lambda}"
        )));
    }

    output.clear();
    output.resize(input.len(), 0.0);

    if input.is_empty() {
        return Ok(());
    }
    if lambda == 0.0 {
        output.copy_from_slice(input);
        return Ok(());
    }

    run_taut_string(input, lambda, output);
    Ok(())
}

/// Allocating convenience wrapper around [`tv1d_denoise_into`].
pub fn tv1d_denoise(input: &[f64], lambda: f64) -> Result<Vec<f64>, PcrError> {
    let mut output = Vec::new();
    tv1d_denoise_into(input, lambda, &mut output)?;
    Ok(output)
}

fn run_taut_string(input: &[f64], lambda: f64, output: &mut [f64]) {
    let last = input.len() - 1;

    // k: current sample, k0: start of the open segment, kminus/kplus: last
    // positions where the dual variable touched +lambda / -lambda.
    let mut k = 0usize;
    let mut k0 = 0usize;
    let mut kminus = 0usize;
    let mut kplus = 0usize;

    // Dual bounds and the admissible value range of the open segment.
    let mut umin = lambda;
    let mut umax = -lambda;
    let mut vmin = input[0] - lambda;
    let mut vmax = input[0] + lambda;

    let two_lambda = 2.0 * lambda;
    let neg_lambda = -lambda;

    loop {
        while k == last {
            if umin < 0.0 {
                // vmin was too high: emit a downward jump at kminus.
                loop {
                    output[k0] = vmin;
                    k0 += 1;
                    if k0 > kminus {
                        break;
                    }
                }
                k = k0;
                kminus = k0;
                vmin = input[k0];
                umin = lambda;
                umax = vmin + umin - vmax;
            } else if umax > 0.0 {
                // vmax was too low: emit an upward jump at kplus.
                loop {
                    output[k0] = vmax;
                    k0 += 1;
                    if k0 > kplus {
                        break;
                    }
                }
                k = k0;
                kplus = k0;
                vmax = input[k0];
                umax = neg_lambda;
                umin = vmax + umax - vmin;
            } else {
                // Both duals inside the tube: close the final segment at its
                // mean-adjusted lower bound.
                vmin += umin / (k - k0 + 1) as f64;
                loop {
                    output[k0] = vmin;
                    k0 += 1;
                    if k0 > k {
                        break;
                    }
                }
                return;
            }
        }

        umin += input[k + 1] - vmin;
        if umin < neg_lambda {
            // Negative jump is unavoidable: flush the segment at vmin.
            loop {
                output[k0] = vmin;
                k0 += 1;
                if k0 > kminus {
                    break;
                }
            }
            k = k0;
            kminus = k0;
            kplus = k0;
            vmin = input[k0];
            vmax = vmin + two_lambda;
            umin = lambda;
            umax = neg_lambda;
        } else {
            umax += input[k + 1] - vmax;
            if umax > lambda {
                // Positive jump is unavoidable: flush the segment at vmax.
                loop {
                    output[k0] = vmax;
                    k0 += 1;
                    if k0 > kplus {
                        break;
                    }
                }
                k = k0;
                kminus = k0;
                kplus = k0;
                vmax = input[k0];
                vmin = vmax - two_lambda;
                umin = lambda;
                umax = neg_lambda;
            } else {
                // No jump: advance and refit the segment bounds.
                k += 1;
                if umin >= lambda {
                    kminus = k;
                    vmin += (umin - lambda) / (kminus - k0 + 1) as f64;
                    umin = lambda;
                }
                if umax <= neg_lambda {
                    kplus = k;
                    vmax += (umax + lambda) / (kplus - k0 + 1) as f64;
                    umax = neg_lambda;
                }
            }
        }
    }
}
