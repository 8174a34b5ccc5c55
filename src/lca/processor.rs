//! Recomputation of whole project variants into the cache

use std::collections::HashMap;
use std::rc::Rc;

use crate::core::cache::{AggregateStats, CacheItemKind, CacheWriter, LcaCache};
use crate::core::identity::{
    CacheItemId, ElementId, ElementTypeNodeId, ProcessConfigId, ProjectId, VariantId,
};
use crate::entities::element::Element;
use crate::entities::process::{LifeCycleModule, ProcessDb, ProcessLifeCycle, Stage};
use crate::entities::quantity::{Quantity, Unit};
use crate::entities::variant::{Project, ProjectVariant};
use crate::lca::component_calculator::ElementComponentCalculator;
use crate::lca::error::LcaResult;
use crate::lca::extant_savings_calculator::ExtantSavingsCalculator;
use crate::lca::final_energy_calculator::FinalEnergyCalculator;
use crate::lca::observer::{LcaObserver, ObserverList};
use crate::lca::process_calculator::ProcessIndicatorCalculator;
use crate::lca::repository::{ElementTypeRepository, ProcessRepository};
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::result::{IndicatorResult, IndicatorResults};

/// Orchestrates the calculators and writes their results to the cache
pub struct LcaProcessor<R> {
    repository: R,
    cache: LcaCache,
    observers: ObserverList,
}

/// Per-project data shared by all computations of one pass
struct Context {
    process_db: ProcessDb,
    calculator: ProcessIndicatorCalculator,
}

impl<R: ProcessRepository + ElementTypeRepository> LcaProcessor<R> {
    pub fn new(repository: R, cache: LcaCache) -> Self {
        Self {
            repository,
            cache,
            observers: ObserverList::new(),
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn LcaObserver>) {
        self.observers.register(observer);
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn cache(&self) -> &LcaCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LcaCache {
        &mut self.cache
    }

    pub fn into_cache(self) -> LcaCache {
        self.cache
    }

    fn context(&self, project: &Project) -> LcaResult<Context> {
        let process_db = self.repository.require_process_db(project.process_db_id)?.clone();
        let calculator = ProcessIndicatorCalculator::new(
            self.repository.indicators(process_db.id),
            process_db.en15804,
        )?;
        Ok(Context {
            process_db,
            calculator,
        })
    }

    /// Run `f` on a pass over one variant inside one transaction
    fn with_pass<T>(
        &mut self,
        project: &Project,
        variant: &ProjectVariant,
        f: impl FnOnce(&mut VariantPass<'_, R>) -> LcaResult<T>,
    ) -> LcaResult<T> {
        let context = self.context(project)?;
        let Self {
            repository,
            cache,
            observers,
        } = self;

        cache.unit_of_work(|writer| {
            let root = writer.store_variant(project.id, variant)?;
            let mut pass = VariantPass {
                repository,
                writer,
                observers,
                context: &context,
                project,
                variant,
                root,
                life_cycles: HashMap::new(),
                type_items: HashMap::new(),
            };
            f(&mut pass)
        })
    }

    /// Recompute a whole project variant
    ///
    /// Elements, final energy demands, supplies, reference models and
    /// transports are written in one transaction. Ancestor totals are left
    /// outdated until [`LcaProcessor::update_cache`].
    pub fn compute_project_variant(
        &mut self,
        project: &Project,
        variant: &ProjectVariant,
    ) -> LcaResult<()> {
        self.with_pass(project, variant, |pass| {
            let mut all_elements = Vec::new();
            let mut stack: Vec<&Element> = variant.elements.iter().collect();
            while let Some(element) = stack.pop() {
                all_elements.push(element.id);
                stack.extend(element.sub_elements.iter());
            }
            pass.writer.remove_stale_elements(variant.id, &all_elements)?;

            for element in &variant.elements {
                pass.compute_element(element, None)?;
            }
            pass.compute_final_energy_demands()?;
            pass.compute_final_energy_supplies()?;
            pass.compute_final_energy_ref_models()?;
            pass.compute_transports()?;
            Ok(())
        })?;

        self.observers
            .notify(|o| o.after_recomputation(project.id, variant.id));
        Ok(())
    }

    /// Recompute one element of a variant
    ///
    /// A top-level element hangs below its element type chain; sub-elements
    /// of composites hang below `composite_parent`.
    pub fn compute_element(
        &mut self,
        project: &Project,
        variant: &ProjectVariant,
        element: &Element,
        composite_parent: Option<CacheItemId>,
    ) -> LcaResult<CacheItemId> {
        self.with_pass(project, variant, |pass| {
            pass.compute_element(element, composite_parent)
        })
    }

    pub fn compute_final_energy_demands(
        &mut self,
        project: &Project,
        variant: &ProjectVariant,
    ) -> LcaResult<()> {
        self.with_pass(project, variant, |pass| pass.compute_final_energy_demands())
    }

    pub fn compute_final_energy_supplies(
        &mut self,
        project: &Project,
        variant: &ProjectVariant,
    ) -> LcaResult<()> {
        self.with_pass(project, variant, |pass| pass.compute_final_energy_supplies())
    }

    pub fn compute_final_energy_ref_models(
        &mut self,
        project: &Project,
        variant: &ProjectVariant,
    ) -> LcaResult<()> {
        self.with_pass(project, variant, |pass| {
            pass.compute_final_energy_ref_models()
        })
    }

    pub fn compute_transports(&mut self, project: &Project, variant: &ProjectVariant) -> LcaResult<()> {
        self.with_pass(project, variant, |pass| pass.compute_transports())
    }

    /// Reaggregate the cache of a project
    ///
    /// With a variant id its root is flagged outdated first, forcing its
    /// totals to be rebuilt.
    pub fn update_cache(
        &mut self,
        project_id: ProjectId,
        variant_id: Option<VariantId>,
    ) -> LcaResult<AggregateStats> {
        let stats = self.cache.unit_of_work(|writer| {
            if let Some(variant_id) = variant_id {
                if let Some(root) =
                    writer.item_id(CacheItemKind::Variant, variant_id.raw(), variant_id)?
                {
                    writer.mark_outdated(root)?;
                }
            }
            writer.update_project(project_id)
        })?;

        self.observers
            .notify(|o| o.after_cache_update(project_id, variant_id));
        Ok(stats)
    }

    /// Recompute every variant of a project and reaggregate
    ///
    /// Cached trees of variants the project no longer has are removed first.
    pub fn compute_project(&mut self, project: &Project) -> LcaResult<AggregateStats> {
        let keep: Vec<VariantId> = project.variants.iter().map(|v| v.id).collect();
        let removed = self
            .cache
            .unit_of_work(|w| w.remove_stale_variants(project.id, &keep))?;
        if removed > 0 {
            tracing::info!(project = %project.id, removed, "removed stale variants");
        }

        for variant in &project.variants {
            self.compute_project_variant(project, variant)?;
        }
        self.update_cache(project.id, None)
    }
}

/// Stack frame of the element traversal
enum Frame<'e> {
    Enter(&'e Element, Option<CacheItemId>),
    Exit(&'e Element),
}

/// State of one transaction over one variant
struct VariantPass<'a, R> {
    repository: &'a R,
    writer: &'a CacheWriter<'a>,
    observers: &'a mut ObserverList,
    context: &'a Context,
    project: &'a Project,
    variant: &'a ProjectVariant,
    root: CacheItemId,
    life_cycles: HashMap<ProcessConfigId, Rc<ProcessLifeCycle>>,
    type_items: HashMap<ElementTypeNodeId, CacheItemId>,
}

impl<'a, R: ProcessRepository + ElementTypeRepository> VariantPass<'a, R> {
    fn life_cycle(&mut self, id: ProcessConfigId) -> LcaResult<Rc<ProcessLifeCycle>> {
        if let Some(lc) = self.life_cycles.get(&id) {
            return Ok(Rc::clone(lc));
        }
        let lc = Rc::new(self.repository.life_cycle(id, self.context.process_db.id)?);
        self.life_cycles.insert(id, Rc::clone(&lc));
        Ok(lc)
    }

    /// Module a missing dataset of `stage` is reported under
    fn missing_module(&self, stage: Stage) -> LifeCycleModule {
        let en15804 = self.context.process_db.en15804;
        match stage {
            Stage::Production if en15804 => LifeCycleModule::A13,
            Stage::Production => LifeCycleModule::Prod,
            Stage::Construction if en15804 => LifeCycleModule::A4,
            _ if en15804 => LifeCycleModule::B6,
            _ => LifeCycleModule::Op,
        }
    }

    /// Store `results` on `item`, flagged partial when `missing` names a
    /// stage without any dataset
    ///
    /// The missing module gets rows with undefined values so the flag
    /// reaches the ancestors' rows of that module and their totals.
    fn store_results(
        &self,
        item: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
        missing: Option<Stage>,
    ) -> LcaResult<()> {
        self.writer
            .store_indicators(item, results, false, missing.is_some())?;
        if let Some(stage) = missing {
            self.store_missing(item, stage)?;
        }
        Ok(())
    }

    fn store_missing(&self, item: CacheItemId, stage: Stage) -> LcaResult<()> {
        let mut missing = IndicatorResults::new(self.missing_module(stage), None, 1.0);
        for indicator in self.context.calculator.indicators() {
            missing.set(IndicatorResult::new(indicator.id, None));
        }
        self.writer.store_indicator_results(item, &missing, false, true)
    }

    /// Cache item of an element type, creating its chain below the root
    fn element_type_item(&mut self, node_id: ElementTypeNodeId) -> LcaResult<CacheItemId> {
        if let Some(item) = self.type_items.get(&node_id) {
            return Ok(*item);
        }

        let mut chain: Vec<ElementTypeNodeId> = self
            .repository
            .element_type_chain(node_id)
            .iter()
            .map(|t| t.node_id)
            .collect();
        if chain.is_empty() {
            tracing::warn!(node = %node_id, "unknown element type, placing below the variant");
            chain.push(node_id);
        }

        let mut parent = self.root;
        for node in chain {
            parent = match self.type_items.get(&node) {
                Some(item) => *item,
                None => {
                    let item = self.writer.store_element_type(
                        self.project.id,
                        self.variant.id,
                        node,
                        parent,
                    )?;
                    self.type_items.insert(node, item);
                    item
                }
            };
        }
        Ok(parent)
    }

    fn compute_element<'e>(
        &mut self,
        element: &'e Element,
        composite_parent: Option<CacheItemId>,
    ) -> LcaResult<CacheItemId> {
        let mut first_item = None;
        let mut stack = vec![Frame::Enter(element, composite_parent)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(element, parent) => {
                    self.observers.notify(|o| o.before_element(element));

                    let parent = match parent {
                        Some(parent) => parent,
                        None => self.element_type_item(element.element_type_node_id)?,
                    };
                    let item = self.writer.store_element(
                        self.project.id,
                        self.variant.id,
                        element,
                        parent,
                    )?;
                    self.writer.clear_indicators(item)?;
                    first_item.get_or_insert(item);

                    stack.push(Frame::Exit(element));
                    if element.is_composite {
                        let keep: Vec<ElementId> =
                            element.sub_elements.iter().map(|e| e.id).collect();
                        self.writer
                            .remove_sub_elements(self.variant.id, item, &keep)?;
                        for sub in element.sub_elements.iter().rev() {
                            stack.push(Frame::Enter(sub, Some(item)));
                        }
                    } else {
                        self.compute_components(element, item)?;
                    }
                }
                Frame::Exit(element) => {
                    self.observers.notify(|o| o.after_element(element));
                }
            }
        }

        Ok(first_item.unwrap_or(self.root))
    }

    fn compute_components(&mut self, element: &Element, item: CacheItemId) -> LcaResult<()> {
        let keep: Vec<_> = element.components.iter().map(|c| c.id).collect();
        let removed = self
            .writer
            .remove_element_components(self.variant.id, item, &keep)?;
        if removed > 0 {
            tracing::debug!(element = %element.id, removed, "removed stale components");
        }

        let context = self.context;
        let calculator = &context.calculator;
        let components = ElementComponentCalculator::new(
            calculator,
            self.project.life_time,
            &self.project.maintenance,
        );
        let savings = ExtantSavingsCalculator::new(calculator);

        for component in &element.components {
            let life_cycle = self.life_cycle(component.process_config_id)?;
            let Some(results) = components.compute(component, element.quantity, &life_cycle)? else {
                self.writer.remove_component(self.variant.id, component.id)?;
                continue;
            };
            let missing = life_cycle
                .production_processes()
                .next()
                .is_none()
                .then_some(Stage::Production);
            if missing.is_some() {
                tracing::warn!(
                    component = %component.id,
                    process_config = %component.process_config_id,
                    process_db = %context.process_db.id,
                    "no production dataset, results are partial"
                );
            }

            let component_item = self.writer.store_component(
                self.project.id,
                self.variant.id,
                component.id,
                item,
                &results,
            )?;
            self.writer.clear_indicators(component_item)?;

            if !component.is_extant {
                self.store_results(component_item, &results, missing)?;
                self.writer
                    .remove_extant_savings(self.variant.id, component.id)?;
                continue;
            }

            // extant: production already happened
            for (_, entry) in results.iter() {
                let zero = entry.stage() == Stage::Production;
                self.writer
                    .store_indicator_results(component_item, entry, zero, missing.is_some())?;
            }
            if let Some(stage) = missing {
                self.store_missing(component_item, stage)?;
            }

            if let Some(saved) = savings.compute(component, element.quantity, &life_cycle)? {
                let savings_item = self.writer.store_extant_savings(
                    self.project.id,
                    self.variant.id,
                    component.id,
                    item,
                    &saved,
                )?;
                self.writer.clear_indicators(savings_item)?;
                self.store_results(savings_item, &saved, missing)?;
            }
        }
        Ok(())
    }

    fn compute_final_energy_demands(&mut self) -> LcaResult<()> {
        let variant = self.variant;
        self.observers
            .notify(|o| o.before_final_energy_demand(variant));

        self.writer.remove_final_energy_demands(variant.id)?;
        let context = self.context;
        let energy = FinalEnergyCalculator::new(&context.calculator);
        for demand in &variant.final_energy_demands {
            let life_cycle = self.life_cycle(demand.process_config_id)?;
            let kwh = demand.quantity(variant.ngf, self.project.life_time);
            let results = energy.compute(kwh, &life_cycle, false)?;

            let item = self.writer.store_final_energy_demand(
                self.project.id,
                variant.id,
                demand.id,
                self.root,
                &results,
            )?;
            let missing = life_cycle
                .usage_processes()
                .next()
                .is_none()
                .then_some(Stage::Usage);
            self.store_results(item, &results, missing)?;
        }

        self.observers
            .notify(|o| o.after_final_energy_demand(variant));
        Ok(())
    }

    fn compute_final_energy_supplies(&mut self) -> LcaResult<()> {
        let variant = self.variant;
        self.observers
            .notify(|o| o.before_final_energy_supply(variant));

        self.writer.remove_final_energy_supplies(variant.id)?;
        let context = self.context;
        let energy = FinalEnergyCalculator::new(&context.calculator);
        for supply in &variant.final_energy_supplies {
            let life_cycle = self.life_cycle(supply.process_config_id)?;
            let invert = self
                .repository
                .process_config(supply.process_config_id)
                .map(|c| c.attributes.invert_values)
                .unwrap_or(false);
            let kwh = supply.total_quantity(self.project.life_time);
            let results = energy.compute(kwh, &life_cycle, invert)?;

            let item = self.writer.store_final_energy_supply(
                self.project.id,
                variant.id,
                supply.id,
                self.root,
                &results,
            )?;
            let missing = life_cycle
                .usage_processes()
                .next()
                .is_none()
                .then_some(Stage::Usage);
            self.store_results(item, &results, missing)?;
        }

        self.observers
            .notify(|o| o.after_final_energy_supply(variant));
        Ok(())
    }

    fn compute_final_energy_ref_models(&mut self) -> LcaResult<()> {
        let variant = self.variant;
        self.writer.remove_final_energy_ref_models(variant.id)?;
        let context = self.context;
        let energy = FinalEnergyCalculator::new(&context.calculator);
        for ref_model in &variant.final_energy_ref_models {
            let life_cycle = self.life_cycle(ref_model.process_config_id)?;
            let kwh = ref_model.quantity(variant.ngf, self.project.life_time);
            let results = energy.compute(kwh, &life_cycle, false)?;

            let item = self.writer.store_final_energy_ref_model(
                self.project.id,
                variant.id,
                ref_model.id,
                self.root,
                &results,
            )?;
            let missing = life_cycle
                .usage_processes()
                .next()
                .is_none()
                .then_some(Stage::Usage);
            self.store_results(item, &results, missing)?;
        }
        Ok(())
    }

    fn compute_transports(&mut self) -> LcaResult<()> {
        let variant = self.variant;
        self.writer.remove_transport_means(variant.id)?;
        let en15804 = self.context.process_db.en15804;

        for transport in variant.transports.iter().filter(|t| t.calc_lca) {
            for mean in &transport.means {
                let life_cycle = self.life_cycle(mean.process_config_id)?;
                let quantity = Quantity::new(transport.performance(mean), Unit::TonneKilometre);
                let results = self.context.calculator.compute_life_cycle(
                    &life_cycle,
                    &quantity,
                    None,
                    |p| {
                        if en15804 {
                            p.module == LifeCycleModule::A4
                        } else {
                            p.stage() == Stage::Usage
                        }
                    },
                )?;

                let item = self.writer.store_transport_mean(
                    self.project.id,
                    variant.id,
                    mean.id,
                    self.root,
                    &results,
                )?;
                let missing = results.is_empty().then_some(if en15804 {
                    Stage::Construction
                } else {
                    Stage::Usage
                });
                self.store_results(item, &results, missing)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{
        ComponentId, FinalEnergyDemandId, FinalEnergySupplyId, IndicatorId, ProcessDbId,
        ProcessId, TransportId, TransportMeanId,
    };
    use crate::core::loader::Dataset;
    use crate::entities::element::{ElementComponent, ElementType};
    use crate::entities::energy::{EnergyUses, FinalEnergyDemand, FinalEnergySupply};
    use crate::entities::indicator::Indicator;
    use crate::entities::process::{
        Process, ProcessConfig, ProcessConfigAttributes, ProcessConfigLifeCycle,
    };
    use crate::entities::quantity::Conversion;
    use crate::entities::transport::{Transport, TransportMean};
    use crate::entities::variant::MaintenanceFlags;
    use crate::lca::error::LcaError;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    const GWP: IndicatorId = IndicatorId(1);

    fn process(id: u32, module: LifeCycleModule, unit: Unit, gwp: f64) -> Process {
        let mut indicators = BTreeMap::new();
        indicators.insert("gwp".to_string(), Some(gwp));
        indicators.insert("penrt".to_string(), Some(gwp * 10.0));
        Process {
            id: ProcessId(id),
            name: format!("process {}", id),
            module,
            reference: Quantity::new(1.0, unit),
            indicators,
            ratio: None,
        }
    }

    fn config(id: u32, processes: Vec<Process>, invert_values: bool) -> ProcessConfig {
        ProcessConfig {
            id: ProcessConfigId(id),
            name: format!("config {}", id),
            attributes: ProcessConfigAttributes { invert_values },
            conversions: vec![Conversion {
                in_unit: Unit::CubicMetre,
                out_unit: Unit::Kg,
                factor: 1000.0,
            }],
            default_life_time: None,
            life_cycles: vec![ProcessConfigLifeCycle {
                process_db_id: ProcessDbId(1),
                processes,
            }],
        }
    }

    fn dataset() -> Dataset {
        let indicator = |id: u32, ident: &str| Indicator {
            id: IndicatorId(id),
            ident: ident.to_string(),
            name: ident.to_uppercase(),
            unit: String::new(),
            position: id,
        };
        Dataset {
            indicators: vec![indicator(1, "gwp"), indicator(2, "penrt"), indicator(3, "pet")],
            process_dbs: vec![ProcessDb {
                id: ProcessDbId(1),
                name: "OBD 2020".to_string(),
                en15804: true,
            }],
            process_configs: vec![
                config(
                    1,
                    vec![
                        process(1, LifeCycleModule::A13, Unit::CubicMetre, 5.83),
                        process(2, LifeCycleModule::C3, Unit::CubicMetre, 3.23),
                        process(3, LifeCycleModule::A4, Unit::CubicMetre, 100.0),
                    ],
                    false,
                ),
                config(
                    2,
                    vec![process(10, LifeCycleModule::B6, Unit::KilowattHour, 0.5)],
                    false,
                ),
                config(
                    3,
                    vec![process(20, LifeCycleModule::B6, Unit::KilowattHour, 0.25)],
                    true,
                ),
                config(
                    4,
                    vec![
                        process(30, LifeCycleModule::A4, Unit::TonneKilometre, 0.1),
                        process(31, LifeCycleModule::B6, Unit::TonneKilometre, 50.0),
                    ],
                    false,
                ),
            ],
            element_types: vec![
                ElementType {
                    node_id: ElementTypeNodeId(300),
                    parent_node_id: None,
                    din_code: "300".to_string(),
                    name: "Building construction".to_string(),
                },
                ElementType {
                    node_id: ElementTypeNodeId(330),
                    parent_node_id: Some(ElementTypeNodeId(300)),
                    din_code: "330".to_string(),
                    name: "External walls".to_string(),
                },
            ],
            benchmark_versions: vec![],
            digest: String::new(),
        }
    }

    fn component(id: u32, life_time: u32) -> ElementComponent {
        ElementComponent {
            id: ComponentId(id),
            process_config_id: ProcessConfigId(1),
            quantity: Quantity::new(1.0, Unit::CubicMetre),
            life_time,
            life_time_delay: 0,
            is_extant: false,
            calc_lca: true,
        }
    }

    fn element(id: u32, components: Vec<ElementComponent>) -> Element {
        Element {
            id: ElementId(id),
            name: format!("element {}", id),
            element_type_node_id: ElementTypeNodeId(330),
            quantity: 1.0,
            ref_unit: Unit::SquareMetre,
            is_composite: false,
            sub_elements: vec![],
            components,
        }
    }

    fn project(elements: Vec<Element>) -> Project {
        Project {
            id: ProjectId(1),
            name: "Office".to_string(),
            life_time: 50,
            process_db_id: ProcessDbId(1),
            benchmark_version_id: None,
            maintenance: MaintenanceFlags::default(),
            variants: vec![ProjectVariant {
                id: VariantId(10),
                name: "Base".to_string(),
                ngf: 100.0,
                elements,
                final_energy_demands: vec![],
                final_energy_supplies: vec![],
                final_energy_ref_models: vec![],
                transports: vec![],
            }],
        }
    }

    fn processor() -> LcaProcessor<Dataset> {
        LcaProcessor::new(dataset(), LcaCache::open_in_memory().unwrap())
    }

    fn root_value(processor: &LcaProcessor<Dataset>, module: &str) -> Option<f64> {
        let cache = processor.cache();
        let root = cache.variant_root(VariantId(10)).unwrap().unwrap();
        cache.indicator_value(root.id, module, GWP, None).unwrap()
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_end_to_end_component_rows() {
        let project = project(vec![element(1, vec![component(1, 25)])]);
        let mut processor = processor();
        processor.compute_project(&project).unwrap();

        let cache = processor.cache();
        let item = cache
            .find_item(CacheItemKind::Component, 1, VariantId(10))
            .unwrap()
            .unwrap();
        assert_eq!(item.num_replacements, Some(1));
        assert!(close(
            cache.indicator_value(item.id, "A1-3", GWP, Some(ProcessId(1))).unwrap(),
            5.83
        ));
        assert!(close(
            cache.indicator_value(item.id, "C3", GWP, Some(ProcessId(2))).unwrap(),
            3.23
        ));
        assert!(close(cache.indicator_value(item.id, "maint", GWP, None).unwrap(), 9.06));
        // A4 is accounted on the building level
        assert!(cache
            .indicator_value(item.id, "A4", GWP, Some(ProcessId(3)))
            .unwrap()
            .is_none());

        assert!(close(root_value(&processor, "total"), 18.12));
        assert_eq!(processor.cache().statistics().unwrap().outdated_items, 0);
    }

    #[test]
    fn test_element_mass_and_type_chain() {
        let project = project(vec![element(1, vec![component(1, 50), component(2, 50)])]);
        let mut processor = processor();
        processor.compute_project(&project).unwrap();

        let cache = processor.cache();
        let element = cache
            .find_item(CacheItemKind::Element, 1, VariantId(10))
            .unwrap()
            .unwrap();
        assert_eq!(element.mass, Some(2000.0));

        let wall_type = cache
            .find_item(CacheItemKind::ElementType, 330, VariantId(10))
            .unwrap()
            .unwrap();
        let construction = cache
            .find_item(CacheItemKind::ElementType, 300, VariantId(10))
            .unwrap()
            .unwrap();
        assert_eq!(element.parent_id, Some(wall_type.id));
        assert_eq!(wall_type.parent_id, Some(construction.id));
        assert!(close(root_value(&processor, "A1-3"), 11.66));
    }

    #[test]
    fn test_composite_elements_and_observer_order() {
        #[derive(Clone, Default)]
        struct Log(Rc<RefCell<Vec<String>>>);
        impl LcaObserver for Log {
            fn before_element(&mut self, element: &Element) {
                self.0.borrow_mut().push(format!("+{}", element.id.0));
            }
            fn after_element(&mut self, element: &Element) {
                self.0.borrow_mut().push(format!("-{}", element.id.0));
            }
        }

        let mut composite = element(1, vec![]);
        composite.is_composite = true;
        composite.sub_elements = vec![
            element(2, vec![component(1, 50)]),
            element(3, vec![component(2, 50)]),
        ];
        let project = project(vec![composite]);

        let log = Log::default();
        let mut processor = processor();
        processor.register_observer(Box::new(log.clone()));
        processor.compute_project(&project).unwrap();

        assert_eq!(*log.0.borrow(), vec!["+1", "+2", "-2", "+3", "-3", "-1"]);

        let cache = processor.cache();
        let outer = cache
            .find_item(CacheItemKind::Element, 1, VariantId(10))
            .unwrap()
            .unwrap();
        let inner = cache
            .find_item(CacheItemKind::Element, 3, VariantId(10))
            .unwrap()
            .unwrap();
        assert_eq!(inner.parent_id, Some(outer.id));
        assert!(close(
            cache.indicator_value(outer.id, "A1-3", GWP, None).unwrap(),
            11.66
        ));
    }

    #[test]
    fn test_removed_components_leave_the_cache() {
        let mut project = project(vec![element(1, vec![component(1, 50), component(2, 50)])]);
        let mut processor = processor();
        processor.compute_project(&project).unwrap();
        assert!(close(root_value(&processor, "A1-3"), 11.66));

        project.variants[0].elements[0].components.pop();
        processor.compute_project(&project).unwrap();

        assert!(processor
            .cache()
            .find_item(CacheItemKind::Component, 2, VariantId(10))
            .unwrap()
            .is_none());
        assert!(close(root_value(&processor, "A1-3"), 5.83));
    }

    #[test]
    fn test_disabled_component_has_no_item() {
        let mut disabled = component(2, 50);
        disabled.calc_lca = false;
        let project = project(vec![element(1, vec![component(1, 50), disabled])]);
        let mut processor = processor();
        processor.compute_project(&project).unwrap();

        assert!(processor
            .cache()
            .find_item(CacheItemKind::Component, 2, VariantId(10))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_extant_component_and_savings() {
        let mut extant = component(1, 50);
        extant.is_extant = true;
        let project = project(vec![element(1, vec![extant])]);
        let mut processor = processor();
        processor.compute_project(&project).unwrap();

        let cache = processor.cache();
        let item = cache
            .find_item(CacheItemKind::Component, 1, VariantId(10))
            .unwrap()
            .unwrap();
        assert_eq!(
            cache.indicator_value(item.id, "A1-3", GWP, Some(ProcessId(1))).unwrap(),
            Some(0.0)
        );
        assert!(close(
            cache.indicator_value(item.id, "C3", GWP, Some(ProcessId(2))).unwrap(),
            3.23
        ));

        let savings = cache
            .find_item(CacheItemKind::ExtantSavings, 1, VariantId(10))
            .unwrap()
            .unwrap();
        assert!(savings.is_virtual);
        assert!(close(
            cache.indicator_value(savings.id, "A1-3", GWP, Some(ProcessId(1))).unwrap(),
            5.83
        ));
        // savings never enter totals
        assert!(close(root_value(&processor, "total"), 3.23));
    }

    #[test]
    fn test_final_energy_and_transports() {
        let mut project = project(vec![]);
        let variant = &mut project.variants[0];
        variant.final_energy_demands.push(FinalEnergyDemand {
            id: FinalEnergyDemandId(1),
            process_config_id: ProcessConfigId(2),
            uses: EnergyUses {
                heating: 1.0,
                ..Default::default()
            },
            ratio: None,
            efficiency: None,
        });
        variant.final_energy_supplies.push(FinalEnergySupply {
            id: FinalEnergySupplyId(1),
            process_config_id: ProcessConfigId(3),
            quantity: 100.0,
            ratio: 1.0,
            description: "PV".to_string(),
        });
        variant.transports.push(Transport {
            id: TransportId(1),
            name: "Concrete delivery".to_string(),
            quantity: 10.0,
            calc_lca: true,
            means: vec![TransportMean {
                id: TransportMeanId(1),
                process_config_id: ProcessConfigId(4),
                distance: 20.0,
                efficiency: None,
            }],
        });

        let mut processor = processor();
        processor.compute_project(&project).unwrap();

        // demand: 1 kWh/m²a * 100 m² * 50 a * 0.5 = 2500
        // supply: -(100 kWh/a * 50 a * 0.25) = -1250
        assert!(close(root_value(&processor, "B6"), 1250.0));
        // transport: 10 t * 20 km * 0.1, usage processes ignored under EN 15804
        assert!(close(root_value(&processor, "A4"), 20.0));
        assert!(close(root_value(&processor, "total"), 1270.0));
    }

    #[test]
    fn test_conversion_failure_rolls_back() {
        let mut broken = component(1, 50);
        broken.quantity = Quantity::new(1.0, Unit::Piece);
        let project = project(vec![element(1, vec![component(2, 50), broken])]);
        let mut processor = processor();

        let err = processor
            .compute_project_variant(&project, &project.variants[0])
            .unwrap_err();
        assert!(matches!(err, LcaError::Conversion { .. }));
        assert_eq!(processor.cache().statistics().unwrap().total_items, 0);
    }

    #[test]
    fn test_missing_production_dataset_marks_totals_partial() {
        let mut data = dataset();
        data.process_configs.push(config(
            5,
            vec![process(40, LifeCycleModule::C3, Unit::CubicMetre, 2.0)],
            false,
        ));
        let mut incomplete = component(2, 50);
        incomplete.process_config_id = ProcessConfigId(5);
        let project = project(vec![element(1, vec![component(1, 50), incomplete])]);

        let mut processor = LcaProcessor::new(data, LcaCache::open_in_memory().unwrap());
        processor.compute_project(&project).unwrap();

        let cache = processor.cache();
        let partial = |module: &str| {
            cache
                .variant_totals(VariantId(10))
                .unwrap()
                .into_iter()
                .find(|t| t.life_cycle_ident == module && t.indicator_id == GWP)
                .map(|t| t.is_partial)
        };
        assert_eq!(partial("A1-3"), Some(true));
        assert_eq!(partial("total"), Some(true));
        // values of the complete component are kept
        assert!(close(root_value(&processor, "A1-3"), 5.83));
        assert!(close(root_value(&processor, "C3"), 5.23));
    }

    #[test]
    fn test_complete_datasets_are_not_partial() {
        let project = project(vec![element(1, vec![component(1, 50)])]);
        let mut processor = processor();
        processor.compute_project(&project).unwrap();

        let totals = processor.cache().variant_totals(VariantId(10)).unwrap();
        assert!(!totals.is_empty());
        assert!(totals.iter().all(|t| !t.is_partial));
    }

    #[test]
    fn test_unknown_process_db() {
        let mut project = project(vec![]);
        project.process_db_id = ProcessDbId(99);
        let mut processor = processor();
        let err = processor.compute_project(&project).unwrap_err();
        assert!(matches!(err, LcaError::Configuration(_)));
    }
}
