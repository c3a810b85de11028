// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::PcrError;

fn finite_min_max(input: &[f64]) -> Result<(f64, f64), PcrError> {
    if input.is_empty() {
        return Err(PcrError::invalid_input(
            "level generation requires a non-empty input vector",
        ));
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in input {
        if !value.is_finite() {
            return Err(PcrError::numerical_issue(format!(
                "level generation requires finite samples; got {value}"
            )));
        }
        min = min.min(value);
        max = max.max(value);
    }

    Ok((min, max))
}

fn populate(min: f64, distance: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| min + distance * i as f64).collect()
}

/// Linearly spaced levels from the input minimum, `distance` apart, covering
/// the input range. A constant input yields a single level at its value.
pub fn levels_by_distance(input: &[f64], distance: f64) -> Result<Vec<f64>, PcrError> {
    if !distance.is_finite() || distance <= 0.0 {
        return Err(PcrError::invalid_input(format!(
            "level distance must be finite and > 0.0; got {distance}"
        )));
    }

    let (min, max) = finite_min_max(input)?;
    let count = (((max - min) / distance).ceil() as usize).max(1);
    Ok(populate(min, distance, count))
}

/// Exactly `count` linearly spaced levels between the input minimum and
/// maximum.
pub fn levels_by_count(input: &[f64], count: usize) -> Result<Vec<f64>, PcrError> {
    if count == 0 {
        return Err(PcrError::invalid_input(
            "level count must be >= 1; got 0",
        ));
    }

    let (min, max) = finite_min_max(input)?;
    let distance = (max - min) / count as f64;
    Ok(populate(min, distance, count))
}
