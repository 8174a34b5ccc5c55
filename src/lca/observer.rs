//! Hooks fired while a project variant is recomputed

use crate::core::identity::{ProjectId, VariantId};
use crate::entities::element::Element;
use crate::entities::variant::ProjectVariant;

/// Receives progress notifications from the processor
///
/// Every hook has a no-op default. Observers see the input model only and
/// cannot reach results or the cache.
pub trait LcaObserver {
    fn before_element(&mut self, _element: &Element) {}

    fn after_element(&mut self, _element: &Element) {}

    fn before_final_energy_demand(&mut self, _variant: &ProjectVariant) {}

    fn after_final_energy_demand(&mut self, _variant: &ProjectVariant) {}

    fn before_final_energy_supply(&mut self, _variant: &ProjectVariant) {}

    fn after_final_energy_supply(&mut self, _variant: &ProjectVariant) {}

    fn after_recomputation(&mut self, _project_id: ProjectId, _variant_id: VariantId) {}

    fn after_cache_update(&mut self, _project_id: ProjectId, _variant_id: Option<VariantId>) {}
}

/// Observers in registration order
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Box<dyn LcaObserver>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn LcaObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&mut self, mut f: impl FnMut(&mut dyn LcaObserver)) {
        for observer in &mut self.observers {
            f(observer.as_mut());
        }
    }
}

/// Logs every hook at debug level
#[derive(Debug, Default)]
pub struct TracingObserver {
    elements: usize,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LcaObserver for TracingObserver {
    fn after_element(&mut self, element: &Element) {
        self.elements += 1;
        tracing::debug!(element = %element.id, name = %element.name, "element computed");
    }

    fn before_final_energy_demand(&mut self, variant: &ProjectVariant) {
        tracing::debug!(
            variant = %variant.id,
            count = variant.final_energy_demands.len(),
            "computing final energy demands"
        );
    }

    fn before_final_energy_supply(&mut self, variant: &ProjectVariant) {
        tracing::debug!(
            variant = %variant.id,
            count = variant.final_energy_supplies.len(),
            "computing final energy supplies"
        );
    }

    fn after_recomputation(&mut self, project_id: ProjectId, variant_id: VariantId) {
        tracing::info!(
            project = %project_id,
            variant = %variant_id,
            elements = self.elements,
            "variant recomputed"
        );
        self.elements = 0;
    }

    fn after_cache_update(&mut self, project_id: ProjectId, variant_id: Option<VariantId>) {
        match variant_id {
            Some(variant) => tracing::debug!(project = %project_id, variant = %variant, "cache updated"),
            None => tracing::debug!(project = %project_id, "cache updated"),
        }
    }
}
