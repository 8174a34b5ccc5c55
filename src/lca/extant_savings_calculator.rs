//! Production impact avoided by keeping extant components

use crate::entities::element::ElementComponent;
use crate::entities::process::{ProcessLifeCycle, Stage};
use crate::lca::error::LcaResult;
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::process_calculator::ProcessIndicatorCalculator;

pub struct ExtantSavingsCalculator<'a> {
    processes: &'a ProcessIndicatorCalculator,
}

impl<'a> ExtantSavingsCalculator<'a> {
    pub fn new(processes: &'a ProcessIndicatorCalculator) -> Self {
        Self { processes }
    }

    /// Production-stage results a new component of the same kind would cause
    ///
    /// `None` unless the component is extant and takes part in the LCA.
    pub fn compute(
        &self,
        component: &ElementComponent,
        element_quantity: f64,
        life_cycle: &ProcessLifeCycle,
    ) -> LcaResult<Option<ProcessLifeCycleLcaResults>> {
        if !component.is_extant || !component.calc_lca {
            return Ok(None);
        }

        let quantity = component.total_quantity(element_quantity);
        let results = self.processes.compute_life_cycle(life_cycle, &quantity, None, |p| {
            p.stage() == Stage::Production
        })?;
        Ok(Some(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{ComponentId, IndicatorId, ProcessConfigId, ProcessDbId, ProcessId};
    use crate::entities::indicator::Indicator;
    use crate::entities::process::{LifeCycleModule, Process};
    use crate::entities::quantity::{Converter, Quantity, Unit};
    use std::collections::BTreeMap;

    const GWP: IndicatorId = IndicatorId(1);

    fn fixture() -> (ProcessIndicatorCalculator, ProcessLifeCycle) {
        let indicator = |id: u32, ident: &str| Indicator {
            id: IndicatorId(id),
            ident: ident.to_string(),
            name: String::new(),
            unit: String::new(),
            position: id,
        };
        let calc =
            ProcessIndicatorCalculator::new(vec![indicator(1, "gwp"), indicator(2, "pet")], true)
                .unwrap();

        let process = |id: u32, module: LifeCycleModule, gwp: f64| {
            let mut indicators = BTreeMap::new();
            indicators.insert("gwp".to_string(), Some(gwp));
            Process {
                id: ProcessId(id),
                name: String::new(),
                module,
                reference: Quantity::new(1.0, Unit::Kg),
                indicators,
                ratio: None,
            }
        };
        let lc = ProcessLifeCycle::new(
            ProcessConfigId(3),
            ProcessDbId(1),
            vec![
                process(1, LifeCycleModule::A1, 1.0),
                process(2, LifeCycleModule::A2, 2.0),
                process(3, LifeCycleModule::A3, 3.0),
                process(4, LifeCycleModule::C4, 9.0),
            ],
            Converter::default(),
        );
        (calc, lc)
    }

    fn component(is_extant: bool) -> ElementComponent {
        ElementComponent {
            id: ComponentId(8),
            process_config_id: ProcessConfigId(3),
            quantity: Quantity::new(10.0, Unit::Kg),
            life_time: 40,
            life_time_delay: 0,
            is_extant,
            calc_lca: true,
        }
    }

    #[test]
    fn test_savings_cover_production_only() {
        let (calc, lc) = fixture();
        let savings = ExtantSavingsCalculator::new(&calc);

        let results = savings.compute(&component(true), 2.0, &lc).unwrap().unwrap();
        assert_eq!(results.a13().unwrap().value(GWP), Some(120.0));
        assert!(results.get(LifeCycleModule::C4, Some(ProcessId(4))).is_none());
        assert!(results.maintenance().is_none());
    }

    #[test]
    fn test_new_components_have_no_savings() {
        let (calc, lc) = fixture();
        let savings = ExtantSavingsCalculator::new(&calc);
        assert!(savings.compute(&component(false), 1.0, &lc).unwrap().is_none());
    }
}
