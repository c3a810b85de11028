// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::PcrError;

/// Tolerance band around the preferred jump height of the level prior.
pub const PRIOR_EPSILON: f64 = 0.05;

/// Unary cost of assigning `label` to `site`.
pub trait DataCost {
    fn cost(&self, site: usize, label: usize) -> i64;
}

/// Pairwise cost of assigning `label_u` / `label_v` to the chain-adjacent
/// sites `site_u` / `site_v`.
pub trait PairwiseCost {
    fn cost(&self, site_u: usize, site_v: usize, label_u: usize, label_v: usize) -> i64;
}

/// The three interchangeable energy terms; an absent entry disables that
/// term entirely.
#[derive(Default)]
pub struct CostTerms {
    pub data: Option<Box<dyn DataCost>>,
    pub smooth: Option<Box<dyn PairwiseCost>>,
    pub label: Option<Box<dyn PairwiseCost>>,
}

impl CostTerms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: impl DataCost + 'static) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    pub fn with_smooth(mut self, smooth: impl PairwiseCost + 'static) -> Self {
        self.smooth = Some(Box::new(smooth));
        self
    }

    pub fn with_label(mut self, label: impl PairwiseCost + 'static) -> Self {
        self.label = Some(Box::new(label));
        self
    }
}

fn check_lambda(name: &str, lambda: f64) -> Result<(), PcrError> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(PcrError::invalid_input(format!(
            "{name} weight must be finite and >= 0.0; got {lambda}"
        )));
    }
    Ok(())
}

fn check_levels(levels: &[f64]) -> Result<(), PcrError> {
    if levels.is_empty() {
        return Err(PcrError::invalid_input("level vector must not be empty"));
    }
    for &level in levels {
        if !level.is_finite() {
            return Err(PcrError::numerical_issue(format!(
                "levels must be finite; got {level}"
            )));
        }
    }
    Ok(())
}

/// Run-length-weighted absolute deviation from the level value:
/// `lambda * (1 + w_i) * |d_i - L_label|`, discretised by truncation.
pub struct AbsoluteDataCost {
    lambda: f64,
    data: Vec<f64>,
    weights: Vec<usize>,
    levels: Vec<f64>,
}

impl AbsoluteDataCost {
    pub fn new(
        lambda: f64,
        data: &[f64],
        weights: &[usize],
        levels: &[f64],
    ) -> Result<Self, PcrError> {
        check_lambda("data", lambda)?;
        check_levels(levels)?;
        if data.len() != weights.len() {
            return Err(PcrError::invalid_input(format!(
                "data and weight vectors must have equal length; got {} and {}",
                data.len(),
                weights.len()
            )));
        }
        Ok(Self {
            lambda,
            data: data.to_vec(),
            weights: weights.to_vec(),
            levels: levels.to_vec(),
        })
    }
}

impl DataCost for AbsoluteDataCost {
    fn cost(&self, site: usize, label: usize) -> i64 {
        let value = self.data[site];
        let weight = self.weights[site] as f64;
        let level = self.levels[label];

        (self.lambda * (1.0 + weight) * (value - level).abs()) as i64
    }
}

/// Potts smoothness weighted by the adjacent run lengths:
/// `lambda * (1 + w_u + w_v) * [label_u != label_v]`.
pub struct WeightedPottsCost {
    lambda: f64,
    weights: Vec<usize>,
}

impl WeightedPottsCost {
    pub fn new(lambda: f64, weights: &[usize]) -> Result<Self, PcrError> {
        check_lambda("smoothness", lambda)?;
        Ok(Self {
            lambda,
            weights: weights.to_vec(),
        })
    }
}

impl PairwiseCost for WeightedPottsCost {
    fn cost(&self, site_u: usize, site_v: usize, label_u: usize, label_v: usize) -> i64 {
        if label_u == label_v {
            return 0;
        }
        let weight_u = self.weights[site_u] as f64;
        let weight_v = self.weights[site_v] as f64;

        (self.lambda * (1.0 + weight_u + weight_v)) as i64
    }
}

/// Penalises label changes whose level distance deviates from the preferred
/// jump height by more than [`PRIOR_EPSILON`]:
/// `lambda * [| prior_distance - |L_u - L_v| | > epsilon] * [label_u != label_v]`.
pub struct LevelPriorCost {
    lambda: f64,
    prior_distance: f64,
    levels: Vec<f64>,
}

impl LevelPriorCost {
    pub fn new(lambda: f64, prior_distance: f64, levels: &[f64]) -> Result<Self, PcrError> {
        check_lambda("prior", lambda)?;
        check_levels(levels)?;
        if !prior_distance.is_finite() || prior_distance < 0.0 {
            return Err(PcrError::invalid_input(format!(
                "prior distance must be finite and >= 0.0; got {prior_distance}"
            )));
        }
        Ok(Self {
            lambda,
            prior_distance,
            levels: levels.to_vec(),
        })
    }
}

impl PairwiseCost for LevelPriorCost {
    fn cost(&self, _site_u: usize, _site_v: usize, label_u: usize, label_v: usize) -> i64 {
        if label_u == label_v {
            return 0;
        }
        let jump = (self.levels[label_u] - self.levels[label_v]).abs();
        if (self.prior_distance - jump).abs() > PRIOR_EPSILON {
            self.lambda as i64
        } else {
            0
        }
    }
}
