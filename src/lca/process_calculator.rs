//! Indicator values of a single process for a given quantity

use crate::core::identity::{IndicatorId, ProcessId};
use crate::entities::indicator::{pet_members, Indicator};
use crate::entities::process::{Process, ProcessLifeCycle};
use crate::entities::quantity::Quantity;
use crate::lca::error::{LcaError, LcaResult};
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::result::{IndicatorResult, IndicatorResults};

/// Computes one process's contribution for an input quantity
///
/// Holds the active indicator set of a process database. The derived total
/// primary energy indicator (PET) must be part of that set.
#[derive(Debug, Clone)]
pub struct ProcessIndicatorCalculator {
    indicators: Vec<Indicator>,
    pet_id: IndicatorId,
    en15804: bool,
}

impl ProcessIndicatorCalculator {
    pub fn new(indicators: Vec<Indicator>, en15804: bool) -> LcaResult<Self> {
        let pet_id = indicators
            .iter()
            .find(|i| i.is_pet())
            .map(|i| i.id)
            .ok_or_else(|| LcaError::configuration("indicator set lacks the PET indicator"))?;

        Ok(Self {
            indicators,
            pet_id,
            en15804,
        })
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn pet_id(&self) -> IndicatorId {
        self.pet_id
    }

    pub fn is_en15804(&self) -> bool {
        self.en15804
    }

    /// Results of `process_id` for `quantity`, tagged with the process module
    pub fn compute(
        &self,
        life_cycle: &ProcessLifeCycle,
        process_id: ProcessId,
        quantity: &Quantity,
    ) -> LcaResult<IndicatorResults> {
        let process = life_cycle
            .process(process_id)
            .ok_or(LcaError::NotFoundInLifeCycle {
                process_id,
                process_config_id: life_cycle.process_config_id(),
            })?;

        let ratio = match process.ratio {
            Some(r) if r > 0.0 && r <= 1.0 => r,
            Some(r) => {
                tracing::warn!(
                    process = %process.id,
                    ratio = r,
                    "module ratio outside (0, 1], using 1"
                );
                1.0
            }
            None => 1.0,
        };

        let reference = &process.reference;
        let converted = life_cycle
            .convert(quantity, &reference.unit)
            .ok_or_else(|| LcaError::Conversion {
                from: quantity.unit.clone(),
                to: reference.unit.clone(),
                process_config_id: life_cycle.process_config_id(),
            })?;
        tracing::debug!(
            process = %process.id,
            from = %quantity,
            to = %converted,
            "converted quantity"
        );

        let converted_value = ratio * converted.value;
        let (renewable, non_renewable) = pet_members(self.en15804);

        let mut results = IndicatorResults::new(process.module, Some(process.id), ratio);
        let mut pet = 0.0;

        for indicator in &self.indicators {
            if indicator.id == self.pet_id {
                // placeholder keeps the indicator order, filled below
                results.set(IndicatorResult::defined(self.pet_id, 0.0));
                continue;
            }

            let value = match process.indicator_value(&indicator.ident) {
                Some(v) if reference.value != 0.0 => Some(v * converted_value / reference.value),
                _ => None,
            };

            if let Some(v) = value {
                if indicator.ident.eq_ignore_ascii_case(renewable)
                    || indicator.ident.eq_ignore_ascii_case(non_renewable)
                {
                    pet += v;
                }
            }

            results.set(IndicatorResult::new(indicator.id, value));
        }

        results.set(IndicatorResult::defined(self.pet_id, pet));
        Ok(results)
    }

    /// Accumulate every process of `life_cycle` accepted by `include`
    pub fn compute_life_cycle(
        &self,
        life_cycle: &ProcessLifeCycle,
        quantity: &Quantity,
        mass: Option<f64>,
        include: impl Fn(&Process) -> bool,
    ) -> LcaResult<ProcessLifeCycleLcaResults> {
        let mut results = ProcessLifeCycleLcaResults::new(quantity.clone(), mass);
        for process in life_cycle.processes().iter().filter(|p| include(*p)) {
            let contribution = self.compute(life_cycle, process.id, quantity)?;
            results.add_process_indicator_results(contribution);
        }
        Ok(results)
    }
}
