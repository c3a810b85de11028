// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Discrete labeling of compressed chains: an alpha-expansion engine over a
//! sites store, with weighted data/smoothness/prior cost terms and optional
//! jump-height distribution statistics.

pub mod costs;
pub mod engine;
pub mod histogram;
pub mod sites;
pub mod stats;

pub use costs::{
    AbsoluteDataCost, CostTerms, DataCost, LevelPriorCost, PRIOR_EPSILON, PairwiseCost,
    WeightedPottsCost,
};
pub use engine::{
    EngineConfig, ExpansionEngine, InitialAssignment, MoveRecord, NonSubmodularPolicy, Scheduler,
};
pub use histogram::{Histogram, HistogramDistance};
pub use sites::{SiteId, SitesStore};
pub use stats::{JumpPenalty, JumpPenaltyLabelCost, NAN_COST_SENTINEL};
