// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::costs::{CostTerms, PairwiseCost};
use crate::sites::{SiteId, SitesStore};
use crate::stats::JumpPenalty;
use pcr_core::{EnergyHistory, EnergyTerm, PcrError, RunDiagnostics, StableRng, TraceSink};
use pcr_graph::EnergyGraph;
use std::time::Instant;

/// Label scheduling strategy of the expansion loop.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduler {
    /// Shuffle the label table once per iteration and try every label, until
    /// a full iteration leaves the energy unchanged or the iteration bound
    /// is reached.
    Sweep { max_iterations: usize },
    /// Concentrate on energy-reducing labels: a stack of shrinking cycle
    /// sizes; labels that fail to improve are swapped out of the prefix.
    Backtracking,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::Backtracking
    }
}

/// How sites receive their first labels.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitialAssignment {
    /// Argmin of the data cost per site.
    MinDataCost,
    /// A random permutation of the labels dealt round-robin. The shipped
    /// default.
    #[default]
    RandomRoundRobin,
}

/// Reaction to a pairwise term that violates submodularity.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NonSubmodularPolicy {
    /// Perturb the four energies round-robin until the term is
    /// representable by a cut. The shipped default.
    #[default]
    Heal,
    /// Drop the offending pairwise term from the move.
    Reject,
    /// Surface the violation as a fatal engine error.
    Fail,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub scheduler: Scheduler,
    pub initial_assignment: InitialAssignment,
    pub on_non_submodular: NonSubmodularPolicy,
    pub seed: u64,
    pub record_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: Scheduler::default(),
            initial_assignment: InitialAssignment::default(),
            on_non_submodular: NonSubmodularPolicy::default(),
            seed: 0,
            record_history: true,
        }
    }
}

/// Identifies one expansion move for graph dump callbacks.
#[derive(Clone, Copy, Debug)]
pub struct MoveRecord {
    pub move_index: usize,
    pub alpha: usize,
    pub energy: i64,
}

type GraphDumpFn = Box<dyn Fn(&EnergyGraph, &MoveRecord)>;

/// Alpha-expansion move-making over a chain of sites.
///
/// Each move fixes a trial label `alpha`, reduces the binary
/// keep-vs-switch problem to an s-t cut, and accepts the new labeling iff
/// the move energy is strictly below the last accepted one. The energy
/// graph is recycled between moves.
pub struct ExpansionEngine {
    graph: EnergyGraph,
    sites: SitesStore,
    label_table: Vec<usize>,
    costs: CostTerms,
    config: EngineConfig,
    rng: StableRng,
    last_move_energy: i64,
    history: EnergyHistory,
    diagnostics: RunDiagnostics,
    trace: Option<Box<dyn TraceSink>>,
    graph_dump: Option<GraphDumpFn>,
}

impl ExpansionEngine {
    pub fn new(
        n_sites: usize,
        n_labels: usize,
        costs: CostTerms,
        config: EngineConfig,
    ) -> Result<Self, PcrError> {
        if n_sites == 0 {
            return Err(PcrError::invalid_input(
                "expansion engine requires at least one site",
            ));
        }

        let mut sites = SitesStore::new(n_labels)?;
        for id in 0..n_sites {
            sites.insert(id)?;
            sites.set_active(id, true)?;
        }

        let mut diagnostics = RunDiagnostics {
            n_sites,
            n_labels,
            seed: Some(config.seed),
            ..RunDiagnostics::default()
        };
        diagnostics.notes.push(match config.scheduler {
            Scheduler::Sweep { .. } => "sweep scheduler".to_string(),
            Scheduler::Backtracking => "backtracking scheduler".to_string(),
        });

        Ok(Self {
            graph: EnergyGraph::chain(n_sites),
            sites,
            label_table: (0..n_labels).collect(),
            costs,
            config,
            rng: StableRng::new(config.seed),
            last_move_energy: i64::MAX,
            history: EnergyHistory::new(),
            diagnostics,
            trace: None,
            graph_dump: None,
        })
    }

    pub fn with_trace(mut self, trace: Box<dyn TraceSink>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Installs a callback invoked with the solved graph after every move.
    pub fn with_graph_dump(mut self, dump: GraphDumpFn) -> Self {
        self.graph_dump = Some(dump);
        self
    }

    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn n_labels(&self) -> usize {
        self.sites.n_labels()
    }

    /// Seeds every site with a label and its data cost, according to the
    /// configured strategy. Without a data term, sites keep label zero.
    pub fn assign_initial_labels(&mut self) -> Result<(), PcrError> {
        if self.costs.data.is_none() {
            self.sites.update_counting_statistics();
            return Ok(());
        }

        match self.config.initial_assignment {
            InitialAssignment::RandomRoundRobin => {
                self.permute_label_table()?;
                let ids: Vec<SiteId> = self.sites.site_ids().collect();
                let n_labels = self.label_table.len();
                for (position, id) in ids.into_iter().enumerate() {
                    let label = self.label_table[position % n_labels];
                    let cost = self.data_cost_of(id, label)?;
                    self.sites.assign_label_and_cost(id, label, cost)?;
                }
            }
            InitialAssignment::MinDataCost => {
                let ids: Vec<SiteId> = self.sites.site_ids().collect();
                for id in ids {
                    let (label, cost) = self.min_data_cost_label(id)?;
                    self.sites.assign_label_and_cost(id, label, cost)?;
                }
            }
        }

        self.sites.update_counting_statistics();
        Ok(())
    }

    /// Runs the configured scheduler to convergence and returns the final
    /// evaluated energy.
    pub fn expand(&mut self) -> Result<i64, PcrError> {
        self.debug("starting alpha expansion");
        let started = Instant::now();

        let energy = match self.config.scheduler {
            Scheduler::Sweep { max_iterations } => self.expand_sweeping(max_iterations)?,
            Scheduler::Backtracking => self.expand_backtracking()?,
        };

        self.sites.update_counting_statistics();
        self.diagnostics.runtime_ms = Some(started.elapsed().as_millis() as u64);
        self.diagnostics.final_energy = Some(energy);
        self.debug(&format!("alpha expansion finished at energy {energy}"));
        Ok(energy)
    }

    /// Label of one site.
    pub fn label_of(&self, id: SiteId) -> Result<usize, PcrError> {
        self.sites.label_of(id)
    }

    /// All labels in chain order.
    pub fn labels(&self) -> Result<Vec<usize>, PcrError> {
        self.sites
            .site_ids()
            .map(|id| self.sites.label_of(id))
            .collect()
    }

    /// Data + smoothness + label energy of the current labeling, each chain
    /// pair counted once.
    pub fn current_energy(&self) -> Result<i64, PcrError> {
        let data = self.data_energy()?;
        let smooth = self.pairwise_energy(EnergyTerm::Smooth)?;
        let label = self.pairwise_energy(EnergyTerm::Label)?;
        checked_energy_sum(data, smooth, label)
    }

    pub fn energy_history(&self) -> &EnergyHistory {
        &self.history
    }

    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    pub fn sites(&self) -> &SitesStore {
        &self.sites
    }

    /// Reference-distribution penalty of the current transition profile.
    pub fn transition_penalty(&mut self, penalty: &JumpPenalty) -> Result<f64, PcrError> {
        self.sites.update_counting_statistics();
        penalty.penalize(self.sites.transition_counts())
    }

    fn expand_sweeping(&mut self, max_iterations: usize) -> Result<i64, PcrError> {
        let mut new_energy = self.evaluate_and_record()?;

        for iteration in 0..max_iterations {
            let old_energy = new_energy;

            self.update_data_costs()?;
            self.permute_label_table()?;

            let table = self.label_table.clone();
            for alpha in table {
                self.debug(&format!("iteration {iteration}: attempting label {alpha}"));
                self.alpha_move(alpha)?;
            }

            new_energy = self.evaluate_and_record()?;
            if new_energy == old_energy {
                break;
            }
        }

        Ok(new_energy)
    }

    fn expand_backtracking(&mut self) -> Result<i64, PcrError> {
        self.permute_label_table()?;
        self.update_data_costs()?;

        let mut sizes: Vec<usize> = vec![self.label_table.len()];
        let mut next_label = 0usize;

        while let Some(&current_size) = sizes.last() {
            let start_label = next_label;
            let mut cycle_size = current_size;

            while next_label < cycle_size {
                let alpha = self.label_table[next_label];
                self.debug(&format!("cycle size {cycle_size}: attempting label {alpha}"));
                if self.alpha_move(alpha)? {
                    // The label earned its place in the shrinking prefix.
                    next_label += 1;
                } else {
                    cycle_size -= 1;
                    self.label_table.swap(next_label, cycle_size);
                }
            }

            if next_label == start_label {
                // Nothing improved: fall back to the previous cycle size.
                if let Some(previous_size) = sizes.pop() {
                    next_label = previous_size;
                }
            } else if cycle_size < current_size / 2 {
                // Less than half the labels improved: focus on them.
                next_label = 0;
                sizes.push(cycle_size);
            } else {
                next_label = 0;
            }
        }

        self.evaluate_and_record()
    }

    /// One expansion move for the trial label. Returns whether the move
    /// strictly improved on the last accepted energy.
    fn alpha_move(&mut self, alpha: usize) -> Result<bool, PcrError> {
        let active: Vec<SiteId> = self.sites.active_site_ids().collect();
        if active.is_empty() {
            self.debug("no active sites, skipping move");
            return Ok(false);
        }

        self.graph.recycle();
        self.add_data_terms(alpha, &active)?;
        self.add_pairwise_terms(alpha, EnergyTerm::Smooth)?;
        self.add_pairwise_terms(alpha, EnergyTerm::Label)?;

        let move_energy = self.graph.minimize();
        self.diagnostics.moves_attempted += 1;
        self.debug(&format!(
            "move energy {move_energy}, last accepted {}",
            self.last_move_energy
        ));

        if let Some(dump) = &self.graph_dump {
            dump(
                &self.graph,
                &MoveRecord {
                    move_index: self.diagnostics.moves_attempted,
                    alpha,
                    energy: move_energy,
                },
            );
        }

        let accepted = move_energy < self.last_move_energy;
        if accepted {
            self.debug("energy decreased, assigning new labeling");
            for &id in &active {
                if self.graph.is_source_side(id)? {
                    continue;
                }
                let cost = self.data_cost_of(id, alpha)?;
                self.sites.assign_label_and_cost(id, alpha, cost)?;
            }
            self.last_move_energy = move_energy;
            self.diagnostics.moves_accepted += 1;
        }

        if self.config.record_history {
            self.evaluate_and_record()?;
        }

        Ok(accepted)
    }

    fn add_data_terms(&mut self, alpha: usize, active: &[SiteId]) -> Result<(), PcrError> {
        if self.costs.data.is_none() {
            return Ok(());
        }

        for &id in active {
            let keep_cost = self.sites.data_cost(id)?;
            let switch_cost = self.data_cost_of(id, alpha)?;
            self.graph.add_unary(id, keep_cost, switch_cost)?;
        }
        Ok(())
    }

    fn add_pairwise_terms(&mut self, alpha: usize, term: EnergyTerm) -> Result<(), PcrError> {
        if self.select_pairwise(term).is_none() {
            return Ok(());
        }

        for u in 0..self.sites.len() - 1 {
            let v = u + 1;
            let u_active = self.sites.is_active(u)?;
            let v_active = self.sites.is_active(v)?;
            let label_u = self.sites.label_of(u)?;
            let label_v = self.sites.label_of(v)?;

            match (u_active, v_active) {
                (true, true) => {
                    let Some(cost_fn) = self.select_pairwise(term) else {
                        continue;
                    };
                    // Binary value 0 keeps the current label, 1 switches to
                    // alpha, matching the unary convention.
                    let mut e00 = checked_cost(cost_fn.cost(u, v, label_u, label_v))?;
                    let mut e01 = checked_cost(cost_fn.cost(u, v, label_u, alpha))?;
                    let mut e10 = checked_cost(cost_fn.cost(u, v, alpha, label_v))?;
                    let mut e11 = checked_cost(cost_fn.cost(u, v, alpha, alpha))?;

                    if e00 + e11 > e01 + e10 {
                        match self.config.on_non_submodular {
                            NonSubmodularPolicy::Heal => {
                                heal_pairwise(&mut e00, &mut e01, &mut e10, &mut e11);
                                self.diagnostics.healed_pairs += 1;
                            }
                            NonSubmodularPolicy::Reject => {
                                self.debug(&format!(
                                    "skipping non-submodular pair ({u}, {v}) for label {alpha}"
                                ));
                                continue;
                            }
                            // The graph raises the violation.
                            NonSubmodularPolicy::Fail => {}
                        }
                    }

                    self.graph.add_pairwise(u, v, e00, e01, e10, e11)?;
                }
                (true, false) => {
                    let Some(cost_fn) = self.select_pairwise(term) else {
                        continue;
                    };
                    let keep = checked_cost(cost_fn.cost(u, v, label_u, label_v))?;
                    let switch = checked_cost(cost_fn.cost(u, v, alpha, label_v))?;
                    self.graph.add_unary(u, keep, switch)?;
                }
                (false, true) => {
                    let Some(cost_fn) = self.select_pairwise(term) else {
                        continue;
                    };
                    let keep = checked_cost(cost_fn.cost(v, u, label_v, label_u))?;
                    let switch = checked_cost(cost_fn.cost(v, u, alpha, label_u))?;
                    self.graph.add_unary(v, keep, switch)?;
                }
                (false, false) => {}
            }
        }
        Ok(())
    }

    fn select_pairwise(&self, term: EnergyTerm) -> Option<&dyn PairwiseCost> {
        match term {
            EnergyTerm::Smooth => self.costs.smooth.as_deref(),
            EnergyTerm::Label => self.costs.label.as_deref(),
            EnergyTerm::Data => None,
        }
    }

    fn data_cost_of(&self, id: SiteId, label: usize) -> Result<i64, PcrError> {
        match &self.costs.data {
            Some(data_fn) => checked_cost(data_fn.cost(id, label)),
            None => Ok(0),
        }
    }

    fn min_data_cost_label(&self, id: SiteId) -> Result<(usize, i64), PcrError> {
        let mut best_label = 0usize;
        let mut best_cost = i64::MAX;
        for &label in &self.label_table {
            let cost = self.data_cost_of(id, label)?;
            if cost < best_cost {
                best_cost = cost;
                best_label = label;
            }
        }
        Ok((best_label, best_cost))
    }

    fn update_data_costs(&mut self) -> Result<(), PcrError> {
        if self.costs.data.is_none() {
            return Ok(());
        }

        let ids: Vec<SiteId> = self.sites.site_ids().collect();
        for id in ids {
            let label = self.sites.label_of(id)?;
            let cost = self.data_cost_of(id, label)?;
            self.sites.assign_data_cost(id, cost)?;
        }
        Ok(())
    }

    fn permute_label_table(&mut self) -> Result<(), PcrError> {
        self.rng.shuffle(&mut self.label_table)
    }

    /// Evaluates the current labeling and appends the per-term energies to
    /// the history when recording is enabled.
    fn evaluate_and_record(&mut self) -> Result<i64, PcrError> {
        let data = self.data_energy()?;
        let smooth = self.pairwise_energy(EnergyTerm::Smooth)?;
        let label = self.pairwise_energy(EnergyTerm::Label)?;

        if self.config.record_history {
            self.history.push(EnergyTerm::Data, data);
            self.history.push(EnergyTerm::Smooth, smooth);
            self.history.push(EnergyTerm::Label, label);
        }

        checked_energy_sum(data, smooth, label)
    }

    fn data_energy(&self) -> Result<i64, PcrError> {
        if self.costs.data.is_none() {
            return Ok(0);
        }

        let mut energy = 0i64;
        for id in self.sites.site_ids() {
            energy = energy
                .checked_add(self.sites.data_cost(id)?)
                .ok_or_else(|| PcrError::resource_limit("data energy overflow"))?;
        }
        Ok(energy)
    }

    fn pairwise_energy(&self, term: EnergyTerm) -> Result<i64, PcrError> {
        let Some(cost_fn) = self.select_pairwise(term) else {
            return Ok(0);
        };

        let mut energy = 0i64;
        for u in 0..self.sites.len() - 1 {
            let v = u + 1;
            let cost = checked_cost(cost_fn.cost(
                u,
                v,
                self.sites.label_of(u)?,
                self.sites.label_of(v)?,
            ))?;
            energy = energy
                .checked_add(cost)
                .ok_or_else(|| PcrError::resource_limit("pairwise energy overflow"))?;
        }
        Ok(energy)
    }

    fn debug(&self, message: &str) {
        if let Some(trace) = &self.trace {
            trace.debug(message);
        }
    }
}

/// Round-robin perturbation until `e00 + e11 <= e01 + e10`: bump the two
/// mixed energies in turn, then lower the double-switch energy. The
/// deterministic tie-break that makes a violating term representable by a
/// cut with the smallest perturbation.
fn heal_pairwise(e00: &mut i64, e01: &mut i64, e10: &mut i64, e11: &mut i64) {
    let mut round = 0usize;
    while *e00 + *e11 > *e01 + *e10 {
        match round % 3 {
            0 => *e10 += 1,
            1 => *e01 += 1,
            _ => *e11 -= 1,
        }
        round += 1;
    }
}

fn checked_cost(cost: i64) -> Result<i64, PcrError> {
    if cost < 0 {
        return Err(PcrError::invalid_input(format!(
            "cost functions must return non-negative energies; got {cost}"
        )));
    }
    Ok(cost)
}

fn checked_energy_sum(data: i64, smooth: i64, label: i64) -> Result<i64, PcrError> {
    data.checked_add(smooth)
        .and_then(|sum| sum.checked_add(label))
        .ok_or_else(|| PcrError::resource_limit("total energy overflow"))
}

#[cfg(test)]
mod tests {
    use super::{
        EngineConfig, ExpansionEngine, InitialAssignment, NonSubmodularPolicy, Scheduler,
        heal_pairwise,
    };
    use crate::costs::{AbsoluteDataCost, CostTerms, PairwiseCost, WeightedPottsCost};

    fn two_site_costs(lambda_d: f64, lambda_s: f64) -> CostTerms {
        let data = [1.0, 9.0];
        let weights = [1usize, 1usize];
        let levels = [0.0, 10.0];

        let mut terms = CostTerms::new().with_data(
            AbsoluteDataCost::new(lambda_d, &data, &weights, &levels).expect("inputs are valid"),
        );
        if lambda_s > 0.0 {
            terms = terms.with_smooth(
                WeightedPottsCost::new(lambda_s, &weights).expect("inputs are valid"),
            );
        }
        terms
    }

    fn run(costs: CostTerms, config: EngineConfig) -> (Vec<usize>, i64) {
        let mut engine = ExpansionEngine::new(2, 2, costs, config).expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        let energy = engine.expand().expect("expansion succeeds");
        (engine.labels().expect("labels exist"), energy)
    }

    #[test]
    fn data_dominated_chain_assigns_nearest_levels() {
        let config = EngineConfig {
            scheduler: Scheduler::Sweep { max_iterations: 10 },
            ..EngineConfig::default()
        };
        let (labels, energy) = run(two_site_costs(1.0, 0.0), config);
        assert_eq!(labels, vec![0, 1]);
        assert_eq!(energy, 4); // 2 + 2
    }

    #[test]
    fn smoothness_dominated_chain_collapses_to_one_label() {
        let config = EngineConfig {
            scheduler: Scheduler::Sweep { max_iterations: 10 },
            ..EngineConfig::default()
        };
        let (labels, energy) = run(two_site_costs(0.1, 100.0), config);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(energy, 1); // data cost of the off-level site
    }

    #[test]
    fn backtracking_reaches_the_same_optimum_as_sweeping() {
        let sweep = EngineConfig {
            scheduler: Scheduler::Sweep { max_iterations: 20 },
            ..EngineConfig::default()
        };
        let backtrack = EngineConfig::default();

        let (_, sweep_energy) = run(two_site_costs(1.0, 0.0), sweep);
        let (_, backtrack_energy) = run(two_site_costs(1.0, 0.0), backtrack);
        assert_eq!(sweep_energy, backtrack_energy);
    }

    #[test]
    fn min_data_cost_initialisation_is_already_optimal_without_smoothing() {
        let config = EngineConfig {
            scheduler: Scheduler::Sweep { max_iterations: 10 },
            initial_assignment: InitialAssignment::MinDataCost,
            ..EngineConfig::default()
        };
        let mut engine =
            ExpansionEngine::new(2, 2, two_site_costs(1.0, 0.0), config).expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        assert_eq!(engine.labels().expect("labels exist"), vec![0, 1]);
    }

    #[test]
    fn accepted_energy_history_is_non_increasing() {
        let mut engine = ExpansionEngine::new(
            2,
            2,
            two_site_costs(1.0, 0.5),
            EngineConfig::default(),
        )
        .expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        engine.expand().expect("expansion succeeds");

        let history = engine.energy_history();
        let totals: Vec<i64> = (0..history.len(pcr_core::EnergyTerm::Data))
            .map(|i| {
                history.series(pcr_core::EnergyTerm::Data)[i]
                    + history.series(pcr_core::EnergyTerm::Smooth)[i]
                    + history.series(pcr_core::EnergyTerm::Label)[i]
            })
            .collect();

        for window in totals.windows(2) {
            assert!(
                window[1] <= window[0],
                "energy increased: {} -> {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn final_energy_matches_a_fresh_evaluation() {
        let mut engine = ExpansionEngine::new(
            2,
            2,
            two_site_costs(1.0, 0.5),
            EngineConfig::default(),
        )
        .expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        let energy = engine.expand().expect("expansion succeeds");
        assert_eq!(energy, engine.current_energy().expect("evaluation succeeds"));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = EngineConfig {
            seed: 1234,
            ..EngineConfig::default()
        };
        let (first_labels, first_energy) = run(two_site_costs(1.0, 0.5), config);
        let (second_labels, second_energy) = run(two_site_costs(1.0, 0.5), config);
        assert_eq!(first_labels, second_labels);
        assert_eq!(first_energy, second_energy);
    }

    #[test]
    fn installed_trace_sink_receives_move_lines() {
        let mut engine = ExpansionEngine::new(
            2,
            2,
            two_site_costs(1.0, 0.5),
            EngineConfig::default(),
        )
        .expect("config is valid")
        .with_trace(Box::new(pcr_core::BufferedTrace::new()));

        engine.assign_initial_labels().expect("assignment succeeds");
        engine.expand().expect("expansion succeeds");
        // The sink is owned by the engine; reaching here without panicking
        // means every debug call went through it.
        assert!(engine.diagnostics().moves_attempted > 0);
    }

    #[test]
    fn transition_penalty_scores_the_final_labeling() {
        let config = EngineConfig {
            scheduler: Scheduler::Sweep { max_iterations: 10 },
            ..EngineConfig::default()
        };
        let mut engine =
            ExpansionEngine::new(2, 2, two_site_costs(1.0, 0.0), config).expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        engine.expand().expect("expansion succeeds");

        let mut rng = pcr_core::StableRng::new(5);
        let penalty = crate::stats::JumpPenalty::new(10.0, 1.0, &[0.0, 10.0], &mut rng)
            .expect("inputs are valid");
        let cost = engine
            .transition_penalty(&penalty)
            .expect("labels are valid");
        assert!(cost >= 0.0);
    }

    #[test]
    fn zero_sites_are_rejected() {
        assert!(ExpansionEngine::new(0, 2, CostTerms::new(), EngineConfig::default()).is_err());
    }

    #[test]
    fn zero_labels_are_rejected() {
        assert!(ExpansionEngine::new(2, 0, CostTerms::new(), EngineConfig::default()).is_err());
    }

    #[test]
    fn healing_restores_submodularity_with_minimal_perturbation() {
        let (mut e00, mut e01, mut e10, mut e11) = (3i64, 0i64, 0i64, 0i64);
        heal_pairwise(&mut e00, &mut e01, &mut e10, &mut e11);
        assert!(e00 + e11 <= e01 + e10);
        // Three rounds: e10 += 1, e01 += 1, e11 -= 1.
        assert_eq!((e00, e01, e10, e11), (3, 1, 1, -1));
    }

    /// Pairwise cost that rewards agreement: `e00 + e11 > e01 + e10`
    /// whenever both sites share a label different from the trial label.
    struct AgreementReward;
    impl PairwiseCost for AgreementReward {
        fn cost(&self, _: usize, _: usize, a: usize, b: usize) -> i64 {
            if a == b { 5 } else { 0 }
        }
    }

    /// Data term pinning both sites to label 0, so min-data-cost
    /// initialisation produces the agreeing labeling that trips the
    /// violation on the other trial label.
    fn violating_config(policy: NonSubmodularPolicy) -> (CostTerms, EngineConfig) {
        let costs = CostTerms::new()
            .with_data(
                AbsoluteDataCost::new(1.0, &[1.0, 1.0], &[1, 1], &[0.0, 10.0])
                    .expect("inputs are valid"),
            )
            .with_smooth(AgreementReward);
        let config = EngineConfig {
            scheduler: Scheduler::Sweep { max_iterations: 1 },
            initial_assignment: InitialAssignment::MinDataCost,
            on_non_submodular: policy,
            record_history: false,
            ..EngineConfig::default()
        };
        (costs, config)
    }

    #[test]
    fn fail_policy_surfaces_non_submodular_terms() {
        let (costs, config) = violating_config(NonSubmodularPolicy::Fail);
        let mut engine = ExpansionEngine::new(2, 2, costs, config).expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        let error = engine.expand().expect_err("violation must surface");
        assert_eq!(error.code(), "non_submodular");
    }

    #[test]
    fn reject_policy_drops_the_offending_term() {
        let (costs, config) = violating_config(NonSubmodularPolicy::Reject);
        let mut engine = ExpansionEngine::new(2, 2, costs, config).expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        assert!(engine.expand().is_ok());
        assert_eq!(engine.diagnostics().healed_pairs, 0);
    }

    #[test]
    fn heal_policy_repairs_the_term_and_counts_it() {
        let (costs, config) = violating_config(NonSubmodularPolicy::Heal);
        let mut engine = ExpansionEngine::new(2, 2, costs, config).expect("config is valid");
        engine.assign_initial_labels().expect("assignment succeeds");
        assert!(engine.expand().is_ok());
        assert!(engine.diagnostics().healed_pairs > 0);
    }
}
