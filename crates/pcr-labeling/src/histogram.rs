// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::PcrError;
use std::fmt::Write as _;

/// Distance used to compare two histograms of identical geometry.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistogramDistance {
    #[default]
    ChiSquare,
    ChiSquareAlt,
    Correlation,
    Bhattacharyya,
}

#[derive(Clone, Copy, Debug, Default)]
struct Bin {
    sum: f64,
    count: usize,
}

/// Fixed-bin histogram over `f64` values with dedicated underflow and
/// overflow bins at the ends.
///
/// Bin weights are event fractions; with no recorded events they are NaN,
/// which the comparison distances propagate (callers map that to a sentinel
/// cost).
#[derive(Clone, Debug)]
pub struct Histogram {
    bin_size: f64,
    min: f64,
    max: f64,
    bins: Vec<Bin>,
    events: usize,
}

impl Histogram {
    pub fn new(bin_size: f64, min: f64, max: f64) -> Result<Self, PcrError> {
        if !bin_size.is_finite() || bin_size <= 0.0 {
            return Err(PcrError::invalid_input(format!(
                "histogram bin size must be finite and > 0.0; got {bin_size}"
            )));
        }
        if !min.is_finite() || !max.is_finite() || max < min {
            return Err(PcrError::invalid_input(format!(
                "histogram range must be finite with max >= min; got [{min}, {max}]"
            )));
        }

        let mut interior = ((max - min) / bin_size) as usize;
        if (interior as f64) * bin_size < max - min {
            interior += 1;
        }

        Ok(Self {
            bin_size,
            min,
            max,
            bins: vec![Bin::default(); interior + 2],
            events: 0,
        })
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn num_events(&self) -> usize {
        self.events
    }

    fn bin_index(&self, value: f64) -> usize {
        if value < self.min {
            return 0;
        }
        if value >= self.max {
            return self.bins.len() - 1;
        }
        let interior = ((value - self.min) / self.bin_size) as usize + 1;
        interior.min(self.bins.len() - 2)
    }

    pub fn add_value(&mut self, value: f64) {
        self.add_repeated_value(value, 1);
    }

    pub fn add_repeated_value(&mut self, value: f64, n_samples: usize) {
        let index = self.bin_index(value);
        let bin = &mut self.bins[index];
        bin.sum += value * n_samples as f64;
        bin.count += n_samples;
        self.events += n_samples;
    }

    pub fn remove_value(&mut self, value: f64) {
        self.remove_repeated_value(value, 1);
    }

    pub fn remove_repeated_value(&mut self, value: f64, n_samples: usize) {
        let index = self.bin_index(value);
        let bin = &mut self.bins[index];
        if bin.count >= n_samples {
            bin.sum -= value * n_samples as f64;
            bin.count -= n_samples;
        } else {
            bin.sum = 0.0;
            bin.count = 0;
        }
        self.events = self.events.saturating_sub(n_samples);
    }

    pub fn clear(&mut self) {
        self.bins.fill(Bin::default());
        self.events = 0;
    }

    /// Event fraction of bin `index`; NaN when the histogram is empty.
    pub fn weight(&self, index: usize) -> f64 {
        self.bins[index].count as f64 / self.events as f64
    }

    fn bin_lower_bound(&self, index: usize) -> f64 {
        if index == 0 {
            return f64::NEG_INFINITY;
        }
        if index == self.bins.len() - 1 {
            return self.max;
        }
        self.min + (index - 1) as f64 * self.bin_size
    }

    fn bin_upper_bound(&self, index: usize) -> f64 {
        if index == self.bins.len() - 1 {
            return f64::INFINITY;
        }
        self.min + index as f64 * self.bin_size
    }

    /// Midpoint of the bin clamped to the histogram range, so the open
    /// under/overflow bins contribute the range ends.
    fn bin_mean_value(&self, index: usize) -> f64 {
        let lower = self.bin_lower_bound(index).max(self.min);
        let upper = self.bin_upper_bound(index).min(self.max);
        lower + (upper - lower) / 2.0
    }

    /// Weight-averaged bin midpoint.
    pub fn mean(&self) -> f64 {
        (0..self.bins.len())
            .map(|index| self.weight(index) * self.bin_mean_value(index))
            .sum()
    }

    /// Sheppard-corrected standard deviation estimate.
    pub fn deviation(&self) -> f64 {
        let mean = self.mean();
        let variance: f64 = (0..self.bins.len())
            .map(|index| self.weight(index) * (self.bin_mean_value(index) - mean).powi(2))
            .sum();

        (variance - self.bin_size.powi(2) / 12.0).sqrt()
    }

    fn dimensions_match(&self, other: &Histogram) -> bool {
        self.bin_size == other.bin_size
            && self.min == other.min
            && self.max == other.max
            && self.bins.len() == other.bins.len()
    }

    /// Compares the weight profiles of two same-geometry histograms.
    pub fn compare(
        &self,
        other: &Histogram,
        distance: HistogramDistance,
    ) -> Result<f64, PcrError> {
        if !self.dimensions_match(other) {
            return Err(PcrError::invalid_input(
                "histogram comparison requires identical bin geometry",
            ));
        }

        let value = match distance {
            HistogramDistance::ChiSquare => self.chi_square(other),
            HistogramDistance::ChiSquareAlt => self.chi_square_alt(other),
            HistogramDistance::Correlation => self.correlation(other),
            HistogramDistance::Bhattacharyya => self.bhattacharyya(other),
        };
        Ok(value)
    }

    fn chi_square(&self, other: &Histogram) -> f64 {
        let mut result = 0.0;
        for index in 0..self.bins.len() {
            let w1 = self.weight(index);
            let w2 = other.weight(index);
            if w1.abs() > f64::EPSILON {
                result += (w1 - w2).powi(2) / w1;
            }
        }
        result
    }

    fn chi_square_alt(&self, other: &Histogram) -> f64 {
        let mut result = 0.0;
        for index in 0..self.bins.len() {
            let w1 = self.weight(index);
            let w2 = other.weight(index);
            let denominator = w1 + w2;
            if denominator.abs() > f64::EPSILON {
                result += (w1 - w2).powi(2) / denominator;
            }
        }
        2.0 * result
    }

    fn correlation(&self, other: &Histogram) -> f64 {
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        let mut s11 = 0.0;
        let mut s12 = 0.0;
        let mut s22 = 0.0;

        for index in 0..self.bins.len() {
            let a = self.weight(index);
            let b = other.weight(index);
            s12 += a * b;
            s1 += a;
            s11 += a * a;
            s2 += b;
            s22 += b * b;
        }

        let scale = 1.0 / self.bins.len() as f64;
        let numerator = s12 - s1 * s2 * scale;
        let denominator = (s11 - s1 * s1 * scale) * (s22 - s2 * s2 * scale);

        if denominator.abs() > f64::EPSILON {
            numerator / denominator.sqrt()
        } else {
            1.0
        }
    }

    fn bhattacharyya(&self, other: &Histogram) -> f64 {
        let mut coefficient = 0.0;
        let mut s1 = 0.0;
        let mut s2 = 0.0;

        for index in 0..self.bins.len() {
            let a = self.weight(index);
            let b = other.weight(index);
            coefficient += (a * b).sqrt();
            s1 += a;
            s2 += b;
        }

        let product = s1 * s2;
        let scale = if product.abs() > f64::EPSILON {
            1.0 / product.sqrt()
        } else {
            1.0
        };
        (1.0 - coefficient * scale).max(0.0).sqrt()
    }

    /// ASCII bar rendering for debug traces, one line per bin.
    pub fn render_ascii(&self) -> String {
        let mut out = String::new();
        for index in 0..self.bins.len() {
            let weight = self.weight(index);
            let stars = if weight.is_finite() {
                (weight * 100.0).floor().max(0.0) as usize
            } else {
                0
            };
            let _ = writeln!(
                out,
                "[{:8.2}|{:8.2}] {}",
                self.bin_lower_bound(index),
                self.bin_upper_bound(index),
                "*".repeat(stars)
            );
        }
        out
    }
}
