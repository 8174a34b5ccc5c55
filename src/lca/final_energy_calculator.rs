//! Results of operational energy flows

use crate::entities::process::ProcessLifeCycle;
use crate::entities::quantity::{Quantity, Unit};
use crate::lca::error::LcaResult;
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::process_calculator::ProcessIndicatorCalculator;

/// Computes demands, supplies and reference models over the usage stage
pub struct FinalEnergyCalculator<'a> {
    processes: &'a ProcessIndicatorCalculator,
}

impl<'a> FinalEnergyCalculator<'a> {
    pub fn new(processes: &'a ProcessIndicatorCalculator) -> Self {
        Self { processes }
    }

    /// Results for `kwh` over the observation period
    ///
    /// With `invert_values` every contribution is credited (sign flipped),
    /// as used for energy a building supplies to the grid.
    pub fn compute(
        &self,
        kwh: f64,
        life_cycle: &ProcessLifeCycle,
        invert_values: bool,
    ) -> LcaResult<ProcessLifeCycleLcaResults> {
        let quantity = Quantity::new(kwh, Unit::KilowattHour);
        let mut results = ProcessLifeCycleLcaResults::new(quantity.clone(), None);

        for process in life_cycle.usage_processes() {
            let contribution = self.processes.compute(life_cycle, process.id, &quantity)?;
            let contribution = if invert_values {
                contribution.multiply(-1.0)
            } else {
                contribution
            };
            results.add_process_indicator_results(contribution);
        }

        Ok(results)
    }
}
