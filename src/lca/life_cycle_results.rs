//! Per-entity aggregate over all processes of a life cycle

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::identity::{IndicatorId, ProcessId};
use crate::entities::process::{LifeCycleModule, Stage};
use crate::entities::quantity::Quantity;
use crate::entities::variant::MaintenanceFlags;
use crate::lca::result::{IndicatorResult, IndicatorResults};

/// Key of one stored contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResultKey {
    pub module: LifeCycleModule,
    pub process_id: Option<ProcessId>,
}

impl ResultKey {
    pub fn new(module: LifeCycleModule, process_id: Option<ProcessId>) -> Self {
        Self { module, process_id }
    }

    /// Key of a derived entry (combined A1-3, maintenance)
    pub fn derived(module: LifeCycleModule) -> Self {
        Self::new(module, None)
    }
}

/// All indicator results of one component, energy flow or transport mean
#[derive(Debug, Clone, Serialize)]
pub struct ProcessLifeCycleLcaResults {
    quantity: Quantity,
    mass: Option<f64>,
    results: BTreeMap<ResultKey, IndicatorResults>,
    num_replacements: u32,
    a13_aggregated: bool,
}

impl ProcessLifeCycleLcaResults {
    pub fn new(quantity: Quantity, mass: Option<f64>) -> Self {
        Self {
            quantity,
            mass,
            results: BTreeMap::new(),
            num_replacements: 0,
            a13_aggregated: false,
        }
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn mass(&self) -> Option<f64> {
        self.mass
    }

    pub fn num_replacements(&self) -> u32 {
        self.num_replacements
    }

    /// Whether A1, A2 and A3 contributions were folded into a combined entry
    pub fn is_a13_aggregated(&self) -> bool {
        self.a13_aggregated
    }

    pub fn get(&self, module: LifeCycleModule, process_id: Option<ProcessId>) -> Option<&IndicatorResults> {
        self.results.get(&ResultKey::new(module, process_id))
    }

    /// Combined production entry, present once any of A1/A2/A3 was added
    pub fn a13(&self) -> Option<&IndicatorResults> {
        self.results.get(&ResultKey::derived(LifeCycleModule::A13))
    }

    pub fn maintenance(&self) -> Option<&IndicatorResults> {
        self.results.get(&ResultKey::derived(LifeCycleModule::Maint))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &IndicatorResults)> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Add one process contribution
    pub fn add_process_indicator_results(&mut self, results: IndicatorResults) {
        let module = results.module();

        if module.is_a13_source() {
            match self.results.entry(ResultKey::derived(LifeCycleModule::A13)) {
                Entry::Occupied(mut combined) => combined.get_mut().merge(&results),
                Entry::Vacant(slot) => {
                    slot.insert(results.retagged(LifeCycleModule::A13, None));
                }
            }
            self.a13_aggregated = true;
        }

        match self.results.entry(ResultKey::new(module, results.process_id())) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(&results),
            Entry::Vacant(slot) => {
                slot.insert(results);
            }
        }
    }

    /// Compute and store the maintenance entry
    ///
    /// Every production, end-of-life and recycling-potential entry whose
    /// module applies in maintenance recurs `num_replacements` times. While
    /// A1/A2/A3 are combined, only the combined entry is counted.
    pub fn aggregate_maintenance(
        &mut self,
        num_replacements: u32,
        flags: &MaintenanceFlags,
    ) -> &IndicatorResults {
        self.num_replacements = num_replacements;
        let factor = f64::from(num_replacements);

        let mut order: Vec<IndicatorId> = Vec::new();
        let mut seen = BTreeSet::new();
        let mut sums: BTreeMap<IndicatorId, f64> = BTreeMap::new();

        for (key, results) in &self.results {
            if key.module == LifeCycleModule::Maint {
                continue;
            }
            for r in results.iter() {
                if seen.insert(r.indicator_id) {
                    order.push(r.indicator_id);
                }
            }

            let recurs = matches!(
                key.module.stage(),
                Stage::Production | Stage::EndOfLife | Stage::RecyclingPotential
            );
            if !recurs || !flags.applies(key.module) {
                continue;
            }
            if self.a13_aggregated && key.module.is_a13_source() {
                continue;
            }

            for r in results.iter() {
                if let Some(v) = r.value {
                    *sums.entry(r.indicator_id).or_insert(0.0) += v * factor;
                }
            }
        }

        let mut maintenance = IndicatorResults::new(LifeCycleModule::Maint, None, 1.0);
        for id in order {
            let value = sums.get(&id).copied().unwrap_or(0.0);
            maintenance.set(IndicatorResult::defined(id, value));
        }

        let key = ResultKey::derived(LifeCycleModule::Maint);
        self.results.insert(key, maintenance);
        &self.results[&key]
    }
}
