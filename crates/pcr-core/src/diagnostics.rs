// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// Diagnostics schema version for reconstruction run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// The three energy components tracked across expansion moves.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnergyTerm {
    Data,
    Smooth,
    Label,
}

impl EnergyTerm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Smooth => "smooth",
            Self::Label => "label",
        }
    }
}

/// Per-term energy trace over expansion iterations. Purely diagnostic.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnergyHistory {
    series: BTreeMap<EnergyTerm, Vec<i64>>,
}

impl EnergyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observation and hands the energy back for chaining.
    pub fn push(&mut self, term: EnergyTerm, energy: i64) -> i64 {
        self.series.entry(term).or_default().push(energy);
        energy
    }

    pub fn series(&self, term: EnergyTerm) -> &[i64] {
        self.series.get(&term).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self, term: EnergyTerm) -> usize {
        self.series(term).len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }
}

/// Structured metadata captured from one engine run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RunDiagnostics {
    pub n_sites: usize,
    pub n_labels: usize,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub seed: Option<u64>,
    pub moves_attempted: usize,
    pub moves_accepted: usize,
    pub healed_pairs: usize,
    pub final_energy: Option<i64>,
    pub notes: Vec<String>,
}

impl Default for RunDiagnostics {
    fn default() -> Self {
        Self {
            n_sites: 0,
            n_labels: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            seed: None,
            moves_attempted: 0,
            moves_accepted: 0,
            healed_pairs: 0,
            final_energy: None,
            notes: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, EnergyHistory, EnergyTerm, RunDiagnostics};

    #[test]
    fn history_push_returns_the_energy_for_chaining() {
        let mut history = EnergyHistory::new();
        let total = history.push(EnergyTerm::Data, 10)
            + history.push(EnergyTerm::Smooth, 4)
            + history.push(EnergyTerm::Label, 0);
        assert_eq!(total, 14);
    }

    #[test]
    fn history_keeps_independent_series_per_term() {
        let mut history = EnergyHistory::new();
        history.push(EnergyTerm::Data, 10);
        history.push(EnergyTerm::Data, 8);
        history.push(EnergyTerm::Smooth, 3);

        assert_eq!(history.series(EnergyTerm::Data), &[10, 8]);
        assert_eq!(history.series(EnergyTerm::Smooth), &[3]);
        assert!(history.series(EnergyTerm::Label).is_empty());
    }

    #[test]
    fn diagnostics_default_sets_schema_and_engine_version() {
        let diagnostics = RunDiagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(diagnostics.final_energy.is_none());
        assert!(diagnostics.notes.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip_preserves_all_fields() {
        let diagnostics = RunDiagnostics {
            n_sites: 42,
            n_labels: 7,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: Some(12),
            seed: Some(99),
            moves_attempted: 30,
            moves_accepted: 9,
            healed_pairs: 2,
            final_energy: Some(118),
            notes: vec!["backtracking scheduler".to_string()],
        };

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: RunDiagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn energy_history_serde_roundtrip() {
        let mut history = EnergyHistory::new();
        history.push(EnergyTerm::Data, 5);
        history.push(EnergyTerm::Label, 1);

        let encoded = serde_json::to_string(&history).expect("history should serialize");
        let decoded: EnergyHistory =
            serde_json::from_str(&encoded).expect("history should deserialize");
        assert_eq!(decoded, history);
    }
}
