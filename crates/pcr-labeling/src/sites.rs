// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::PcrError;
use std::collections::{BTreeMap, BTreeSet};

/// Stable handle of a site; identical to its energy-graph node index and to
/// its position along the chain.
pub type SiteId = usize;

#[derive(Clone, Debug)]
struct Site {
    label: usize,
    active: bool,
    data_cost: i64,
    label_cost: i64,
}

impl Site {
    fn new() -> Self {
        Self {
            label: 0,
            active: false,
            data_cost: 0,
            label_cost: 0,
        }
    }
}

/// Per-site label/cost/activity state, indexed three ways: by site id
/// (unique, chain-ordered), by current label, and by active flag.
///
/// All mutations go through a single re-indexing helper so the secondary
/// indexes can never drift from the primary map. Unknown site ids are
/// programming errors and surface as [`PcrError::InvalidInput`].
#[derive(Debug)]
pub struct SitesStore {
    n_labels: usize,
    sites: BTreeMap<SiteId, Site>,
    by_label: BTreeMap<usize, BTreeSet<SiteId>>,
    active: BTreeSet<SiteId>,
    label_counts: BTreeMap<usize, usize>,
    transition_counts: BTreeMap<(usize, usize), usize>,
}

impl SitesStore {
    pub fn new(n_labels: usize) -> Result<Self, PcrError> {
        if n_labels == 0 {
            return Err(PcrError::invalid_input(
                "sites store requires at least one label",
            ));
        }
        Ok(Self {
            n_labels,
            sites: BTreeMap::new(),
            by_label: BTreeMap::new(),
            active: BTreeSet::new(),
            label_counts: BTreeMap::new(),
            transition_counts: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    pub fn insert(&mut self, id: SiteId) -> Result<(), PcrError> {
        if self.sites.contains_key(&id) {
            return Err(PcrError::invalid_input(format!(
                "site {id} is already present"
            )));
        }
        self.sites.insert(id, Site::new());
        self.by_label.entry(0).or_default().insert(id);
        Ok(())
    }

    pub fn contains(&self, id: SiteId) -> bool {
        self.sites.contains_key(&id)
    }

    pub fn label_of(&self, id: SiteId) -> Result<usize, PcrError> {
        Ok(self.site(id)?.label)
    }

    pub fn data_cost(&self, id: SiteId) -> Result<i64, PcrError> {
        Ok(self.site(id)?.data_cost)
    }

    pub fn label_cost(&self, id: SiteId) -> Result<i64, PcrError> {
        Ok(self.site(id)?.label_cost)
    }

    pub fn is_active(&self, id: SiteId) -> Result<bool, PcrError> {
        Ok(self.site(id)?.active)
    }

    pub fn assign_label(&mut self, id: SiteId, label: usize) -> Result<(), PcrError> {
        self.check_label(label)?;
        self.modify(id, |site| site.label = label)
    }

    pub fn assign_data_cost(&mut self, id: SiteId, cost: i64) -> Result<(), PcrError> {
        Self::check_cost("data", cost)?;
        self.modify(id, |site| site.data_cost = cost)
    }

    pub fn assign_label_cost(&mut self, id: SiteId, cost: i64) -> Result<(), PcrError> {
        Self::check_cost("label", cost)?;
        self.modify(id, |site| site.label_cost = cost)
    }

    pub fn assign_label_and_cost(
        &mut self,
        id: SiteId,
        label: usize,
        data_cost: i64,
    ) -> Result<(), PcrError> {
        self.check_label(label)?;
        Self::check_cost("data", data_cost)?;
        self.modify(id, |site| {
            site.label = label;
            site.data_cost = data_cost;
        })
    }

    pub fn set_active(&mut self, id: SiteId, active: bool) -> Result<(), PcrError> {
        self.modify(id, |site| site.active = active)
    }

    /// Bulk (de)activation of every site currently carrying `label`.
    pub fn set_active_for_label(&mut self, label: usize, active: bool) -> Result<(), PcrError> {
        self.check_label(label)?;
        let ids: Vec<SiteId> = self
            .by_label
            .get(&label)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for id in ids {
            self.set_active(id, active)?;
        }
        Ok(())
    }

    pub fn mark_all_inactive(&mut self) {
        for site in self.sites.values_mut() {
            site.active = false;
        }
        self.active.clear();
    }

    /// All site ids in chain order.
    pub fn site_ids(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.sites.keys().copied()
    }

    /// Active site ids in chain order.
    pub fn active_site_ids(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.active.iter().copied()
    }

    /// Recomputes the label occupancy counts and the ordered transition
    /// counts `{(previous_label, current_label) -> n}` along the chain.
    pub fn update_counting_statistics(&mut self) {
        self.label_counts.clear();
        self.transition_counts.clear();

        let mut previous: Option<usize> = None;
        for site in self.sites.values() {
            *self.label_counts.entry(site.label).or_insert(0) += 1;

            if let Some(previous_label) = previous
                && previous_label != site.label
            {
                *self
                    .transition_counts
                    .entry((previous_label, site.label))
                    .or_insert(0) += 1;
            }
            previous = Some(site.label);
        }
    }

    /// Occupancy of `label` as of the last statistics update.
    pub fn label_count(&self, label: usize) -> usize {
        self.label_counts.get(&label).copied().unwrap_or(0)
    }

    pub fn label_counts(&self) -> &BTreeMap<usize, usize> {
        &self.label_counts
    }

    pub fn transition_counts(&self) -> &BTreeMap<(usize, usize), usize> {
        &self.transition_counts
    }

    fn site(&self, id: SiteId) -> Result<&Site, PcrError> {
        self.sites
            .get(&id)
            .ok_or_else(|| PcrError::invalid_input(format!("unknown site id {id}")))
    }

    /// Single mutation point: applies `f` and re-indexes whatever changed.
    fn modify<F: FnOnce(&mut Site)>(&mut self, id: SiteId, f: F) -> Result<(), PcrError> {
        let site = self
            .sites
            .get_mut(&id)
            .ok_or_else(|| PcrError::invalid_input(format!("unknown site id {id}")))?;

        let old_label = site.label;
        let old_active = site.active;
        f(site);
        let new_label = site.label;
        let new_active = site.active;

        if new_label != old_label {
            if let Some(set) = self.by_label.get_mut(&old_label) {
                set.remove(&id);
            }
            self.by_label.entry(new_label).or_default().insert(id);
        }
        if new_active != old_active {
            if new_active {
                self.active.insert(id);
            } else {
                self.active.remove(&id);
            }
        }

        Ok(())
    }

    fn check_label(&self, label: usize) -> Result<(), PcrError> {
        if label >= self.n_labels {
            return Err(PcrError::invalid_input(format!(
                "label {label} is out of range for {} labels",
                self.n_labels
            )));
        }
        Ok(())
    }

    fn check_cost(kind: &str, cost: i64) -> Result<(), PcrError> {
        if cost < 0 {
            return Err(PcrError::invalid_input(format!(
                "{kind} cost must be >= 0; got {cost}"
            )));
        }
        Ok(())
    }
}
