//! Results of one element component over its life cycle

use crate::entities::element::ElementComponent;
use crate::entities::process::{LifeCycleModule, Process, ProcessLifeCycle, Stage};
use crate::entities::quantity::Unit;
use crate::entities::variant::MaintenanceFlags;
use crate::lca::error::LcaResult;
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::process_calculator::ProcessIndicatorCalculator;
use crate::lca::replacements::number_of_replacements;

/// Modules accounted on the building level, not per component
fn is_building_level(process: &Process) -> bool {
    process.stage() == Stage::Usage
        || matches!(
            process.module,
            LifeCycleModule::A4 | LifeCycleModule::A5 | LifeCycleModule::C1 | LifeCycleModule::C2
        )
}

pub struct ElementComponentCalculator<'a> {
    processes: &'a ProcessIndicatorCalculator,
    project_life_time: u32,
    maintenance: &'a MaintenanceFlags,
}

impl<'a> ElementComponentCalculator<'a> {
    pub fn new(
        processes: &'a ProcessIndicatorCalculator,
        project_life_time: u32,
        maintenance: &'a MaintenanceFlags,
    ) -> Self {
        Self {
            processes,
            project_life_time,
            maintenance,
        }
    }

    /// Results of `component` within an element of `element_quantity`
    ///
    /// Returns `None` for components excluded from the LCA.
    pub fn compute(
        &self,
        component: &ElementComponent,
        element_quantity: f64,
        life_cycle: &ProcessLifeCycle,
    ) -> LcaResult<Option<ProcessLifeCycleLcaResults>> {
        if !component.calc_lca {
            return Ok(None);
        }

        let quantity = component.total_quantity(element_quantity);
        let mass = match life_cycle.convert(&quantity, &Unit::Kg) {
            Some(kg) => kg.value,
            None => {
                tracing::error!(
                    component = %component.id,
                    process_config = %component.process_config_id,
                    unit = %quantity.unit,
                    "no conversion to kg, using mass 0"
                );
                0.0
            }
        };

        let mut results = self.processes.compute_life_cycle(
            life_cycle,
            &quantity,
            Some(mass),
            |p| !is_building_level(p),
        )?;

        let replacements = number_of_replacements(
            self.project_life_time,
            component.life_time,
            component.life_time_delay,
            component.is_extant,
        );
        results.aggregate_maintenance(replacements, self.maintenance);

        Ok(Some(results))
    }
}
