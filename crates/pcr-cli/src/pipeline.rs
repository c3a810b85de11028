// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Assembly of the reconstruction pipeline behind `graphproc`: chain
//! compression, cost wiring, the expansion engine, and decompression of the
//! result.

use crate::error::CliError;
use pcr_core::{EnergyHistory, Lambdas, PcrError, RunDiagnostics, TraceSink, compress};
use pcr_graph::EnergyGraph;
use pcr_labeling::{
    AbsoluteDataCost, CostTerms, EngineConfig, ExpansionEngine, LevelPriorCost, MoveRecord,
    Scheduler, WeightedPottsCost,
};

/// Compression threshold applied to the (already denoised) input.
const COMPRESSION_THRESHOLD: f64 = 0.0;

#[derive(Clone, Copy, Debug)]
pub struct ReconstructionParams {
    pub lambdas: Lambdas,
    pub prior_distance: Option<f64>,
    /// Negative selects the backtracking scheduler, as on the command line.
    pub max_iterations: i64,
    pub seed: u64,
}

pub struct Reconstruction {
    /// One `(level value, run length)` row per site.
    pub assignments: Vec<(f64, f64)>,
    /// The full-length reconstructed sequence.
    pub expanded: Vec<f64>,
    pub energy: i64,
    pub diagnostics: RunDiagnostics,
    pub history: EnergyHistory,
}

pub fn reconstruct(
    input: &[f64],
    levels: &[f64],
    params: ReconstructionParams,
    trace: Option<Box<dyn TraceSink>>,
    graph_dump: Option<Box<dyn Fn(&EnergyGraph, &MoveRecord)>>,
) -> Result<Reconstruction, CliError> {
    if input.is_empty() {
        return Err(CliError::invalid_input("input vector is empty"));
    }
    if levels.is_empty() {
        return Err(CliError::invalid_input("level vector is empty"));
    }
    if params.lambdas.prior != 0.0 && params.prior_distance.is_none() {
        return Err(CliError::invalid_input(
            "a prior distance is required when the prior term is active",
        ));
    }

    let (data, weights) = compress(input, COMPRESSION_THRESHOLD)?;

    let mut costs = CostTerms::new()
        .with_data(AbsoluteDataCost::new(
            params.lambdas.data,
            &data,
            &weights,
            levels,
        )?)
        .with_smooth(WeightedPottsCost::new(params.lambdas.smooth, &weights)?);
    if params.lambdas.prior != 0.0 {
        let prior_distance = params
            .prior_distance
            .ok_or_else(|| CliError::invalid_input("prior distance is missing"))?;
        costs = costs.with_label(LevelPriorCost::new(
            params.lambdas.prior,
            prior_distance,
            levels,
        )?);
    }

    let scheduler = if params.max_iterations < 0 {
        Scheduler::Backtracking
    } else {
        Scheduler::Sweep {
            max_iterations: params.max_iterations as usize,
        }
    };
    let config = EngineConfig {
        scheduler,
        seed: params.seed,
        ..EngineConfig::default()
    };

    let mut engine = ExpansionEngine::new(data.len(), levels.len(), costs, config)?;
    if let Some(trace) = trace {
        engine = engine.with_trace(trace);
    }
    if let Some(dump) = graph_dump {
        engine = engine.with_graph_dump(dump);
    }

    engine.assign_initial_labels()?;
    let energy = engine.expand()?;

    let labels = engine.labels()?;
    let assignments = collect_assignments(&labels, &weights, levels)?;
    let expanded = expand_assignments(&assignments, input.len());

    Ok(Reconstruction {
        assignments,
        expanded,
        energy,
        diagnostics: engine.diagnostics().clone(),
        history: engine.energy_history().clone(),
    })
}

fn collect_assignments(
    labels: &[usize],
    weights: &[usize],
    levels: &[f64],
) -> Result<Vec<(f64, f64)>, CliError> {
    labels
        .iter()
        .zip(weights)
        .map(|(&label, &weight)| {
            let level = levels.get(label).copied().ok_or_else(|| {
                CliError::from(PcrError::invalid_input(format!(
                    "assigned label {label} has no level value"
                )))
            })?;
            Ok((level, weight as f64))
        })
        .collect()
}

fn expand_assignments(assignments: &[(f64, f64)], n: usize) -> Vec<f64> {
    let mut expanded = Vec::with_capacity(n);
    for &(value, weight) in assignments {
        for _ in 0..weight as usize {
            expanded.push(value);
        }
    }
    expanded
}
