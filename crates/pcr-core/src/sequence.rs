// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::PcrError;

/// First differences; empty for inputs shorter than two samples.
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Number of runs implied by a difference vector: one more than the number
/// of entries whose magnitude exceeds `threshold`.
pub fn count_jumps(diffs: &[f64], threshold: f64) -> usize {
    1 + diffs
        .iter()
        .filter(|delta| delta.abs() > threshold)
        .count()
}

/// Chain compression of a piecewise-constant sequence into parallel
/// `(value, run_length)` vectors.
///
/// A jump sits at every index `i >= 1` with `|y[i] - y[i-1]| > threshold`;
/// each output value is taken at the first sample of its run. The run
/// lengths always sum to the input length, and both outputs have length
/// `1 + jumps`. An empty input compresses to empty outputs.
pub fn compress(values: &[f64], threshold: f64) -> Result<(Vec<f64>, Vec<usize>), PcrError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(PcrError::invalid_input(format!(
            "compression threshold must be finite and >= 0.0; got {threshold}"
        )));
    }
    if values.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut data = Vec::new();
    let mut weights = Vec::new();

    let mut run_start = 0usize;
    for i in 1..values.len() {
        if (values[i] - values[i - 1]).abs() > threshold {
            data.push(values[run_start]);
            weights.push(i - run_start);
            run_start = i;
        }
    }
    data.push(values[run_start]);
    weights.push(values.len() - run_start);

    Ok((data, weights))
}
