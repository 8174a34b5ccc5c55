use super::*;
use crate::core::identity::{
    CacheItemId, ComponentId, ElementId, FinalEnergyRefModelId, IndicatorId, ProcessId,
};
use crate::entities::element::Element;
use crate::entities::process::LifeCycleModule;
use crate::entities::quantity::{Quantity, Unit};
use crate::entities::variant::ProjectVariant;
use crate::lca::error::LcaError;
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::result::{IndicatorResult, IndicatorResults};
use tempfile::tempdir;

const PROJECT: ProjectId = ProjectId(1);
const VARIANT: VariantId = VariantId(10);
const GWP: IndicatorId = IndicatorId(1);

fn variant() -> ProjectVariant {
    ProjectVariant {
        id: VARIANT,
        name: "Base".to_string(),
        ngf: 100.0,
        elements: vec![],
        final_energy_demands: vec![],
        final_energy_supplies: vec![],
        final_energy_ref_models: vec![],
        transports: vec![],
    }
}

fn element(id: u32) -> Element {
    Element {
        id: ElementId(id),
        name: String::new(),
        element_type_node_id: ElementTypeNodeId(330),
        quantity: 1.0,
        ref_unit: Unit::SquareMetre,
        is_composite: false,
        sub_elements: vec![],
        components: vec![],
    }
}

fn entry(module: LifeCycleModule, process: Option<u32>, gwp: f64) -> IndicatorResults {
    let mut results = IndicatorResults::new(module, process.map(ProcessId), 1.0);
    results.set(IndicatorResult::defined(GWP, gwp));
    results
}

fn results(entries: Vec<IndicatorResults>, mass: f64) -> ProcessLifeCycleLcaResults {
    let mut results = ProcessLifeCycleLcaResults::new(Quantity::new(1.0, Unit::CubicMetre), Some(mass));
    for e in entries {
        results.add_process_indicator_results(e);
    }
    results
}

/// variant → type 330 → element 1 → component 1
fn store_component_tree(
    cache: &mut LcaCache,
    component: &ProcessLifeCycleLcaResults,
) -> (CacheItemId, CacheItemId, CacheItemId) {
    cache
        .unit_of_work(|w| {
            let root = w.store_variant(PROJECT, &variant())?;
            let wall = w.store_element_type(PROJECT, VARIANT, ElementTypeNodeId(330), root)?;
            let element = w.store_element(PROJECT, VARIANT, &element(1), wall)?;
            let item = w.store_component(PROJECT, VARIANT, ComponentId(1), element, component)?;
            w.store_indicators(item, component, false, false)?;
            Ok((root, element, item))
        })
        .unwrap()
}

fn value(cache: &LcaCache, item: CacheItemId, module: &str) -> Option<f64> {
    cache.indicator_value(item, module, GWP, None).unwrap()
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
}

#[test]
fn test_cache_creation() {
    let cache = LcaCache::open_in_memory().unwrap();
    let stats = cache.statistics().unwrap();
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.total_indicator_rows, 0);
    assert!(cache.path().is_none());
}

#[test]
fn test_store_twice_keeps_latest_row() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let first = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 10.0);
    let (_, _, item) = store_component_tree(&mut cache, &first);
    cache.update(PROJECT).unwrap();
    assert!(!cache.item(item).unwrap().unwrap().is_outdated);

    let second = results(vec![entry(LifeCycleModule::A13, Some(1), 6.0)], 10.0);
    let (_, _, again) = store_component_tree(&mut cache, &second);
    assert_eq!(again, item);

    let rows: Vec<_> = cache
        .indicators(item)
        .unwrap()
        .into_iter()
        .filter(|r| r.life_cycle_ident == "A1-3")
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, Some(6.0));
    assert_eq!(rows[0].process_id, Some(ProcessId(1)));
    assert!(cache.item(item).unwrap().unwrap().is_outdated);
}

#[test]
fn test_rows_without_process_are_unique() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![], 1.0);
    let (_, _, item) = store_component_tree(&mut cache, &component);

    cache
        .unit_of_work(|w| {
            w.store_indicator_results(item, &entry(LifeCycleModule::Maint, None, 1.0), false, false)?;
            w.store_indicator_results(item, &entry(LifeCycleModule::Maint, None, 2.0), false, false)
        })
        .unwrap();

    let rows = cache.indicators(item).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, Some(2.0));
    assert_eq!(rows[0].process_id, None);
}

#[test]
fn test_zero_values_keep_indicator_tracked() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![], 1.0);
    let (_, _, item) = store_component_tree(&mut cache, &component);

    cache
        .unit_of_work(|w| {
            w.store_indicator_results(item, &entry(LifeCycleModule::A13, Some(1), 5.83), true, false)
        })
        .unwrap();

    assert_eq!(
        cache.indicator_value(item, "A1-3", GWP, Some(ProcessId(1))).unwrap(),
        Some(0.0)
    );
}

#[test]
fn test_aggregation_sums_and_totals() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(
        vec![
            entry(LifeCycleModule::A13, Some(1), 5.83),
            entry(LifeCycleModule::C3, Some(2), 3.23),
            entry(LifeCycleModule::Maint, None, 9.06),
            entry(LifeCycleModule::D, Some(3), -4.0),
        ],
        2400.0,
    );
    let (root, element, item) = store_component_tree(&mut cache, &component);

    let stats = cache.update(PROJECT).unwrap();
    assert_eq!(stats.variants, 1);
    assert_eq!(stats.leaves_refreshed, 1);
    assert_eq!(stats.items_recomputed, 3);

    assert!(close(value(&cache, item, "total"), 18.12));
    assert!(close(value(&cache, element, "A1-3"), 5.83));
    assert!(close(value(&cache, root, "maint"), 9.06));
    assert!(close(value(&cache, root, "D"), -4.0));
    assert!(close(value(&cache, root, "total"), 18.12));

    assert_eq!(cache.item(element).unwrap().unwrap().mass, Some(2400.0));
    assert_eq!(cache.item(root).unwrap().unwrap().mass, Some(2400.0));
    assert_eq!(cache.outdated_count(VARIANT).unwrap(), 0);
}

#[test]
fn test_element_keeps_input_quantity_and_backfills_mass() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let mut wall = element(1);
    wall.quantity = 120.0;
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 800.0);
    let item = cache
        .unit_of_work(|w| {
            let root = w.store_variant(PROJECT, &variant())?;
            let item = w.store_element(PROJECT, VARIANT, &wall, root)?;
            let leaf = w.store_component(PROJECT, VARIANT, ComponentId(1), item, &component)?;
            w.store_indicators(leaf, &component, false, false)?;
            Ok(item)
        })
        .unwrap();

    let stored = cache.item(item).unwrap().unwrap();
    assert_eq!(stored.quantity, Some(120.0));
    assert_eq!(stored.ref_unit.as_deref(), Some("m2"));
    assert_eq!(stored.mass, Some(0.0));

    cache.update(PROJECT).unwrap();
    let stored = cache.item(item).unwrap().unwrap();
    assert_eq!(stored.quantity, Some(120.0));
    assert_eq!(stored.mass, Some(800.0));
}

#[test]
fn test_a13_sources_do_not_count_twice() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(
        vec![
            entry(LifeCycleModule::A1, Some(1), 2.0),
            entry(LifeCycleModule::A2, Some(2), 3.0),
        ],
        1.0,
    );
    let (root, _, item) = store_component_tree(&mut cache, &component);
    cache.update(PROJECT).unwrap();

    assert!(close(value(&cache, item, "A1-3"), 5.0));
    assert!(close(value(&cache, root, "A1"), 2.0));
    assert!(close(value(&cache, root, "total"), 5.0));
}

#[test]
fn test_virtual_items_stay_out_of_totals() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    let (root, _, _) = store_component_tree(&mut cache, &component);

    let ref_model = results(vec![entry(LifeCycleModule::B6, Some(9), 100.0)], 0.0);
    cache
        .unit_of_work(|w| {
            let item = w.store_final_energy_ref_model(
                PROJECT,
                VARIANT,
                FinalEnergyRefModelId(1),
                root,
                &ref_model,
            )?;
            w.store_indicators(item, &ref_model, false, false)
        })
        .unwrap();
    cache.update(PROJECT).unwrap();

    assert_eq!(value(&cache, root, "B6"), None);
    assert!(close(value(&cache, root, "total"), 5.0));

    let reference = cache
        .kind_totals(VARIANT, CacheItemKind::FinalEnergyRefModel)
        .unwrap();
    assert_eq!(reference.get(&GWP), Some(&100.0));
}

#[test]
fn test_remove_component_marks_parent_outdated() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    let (root, element, item) = store_component_tree(&mut cache, &component);
    cache.update(PROJECT).unwrap();

    let removed = cache
        .unit_of_work(|w| w.remove_component(VARIANT, ComponentId(1)))
        .unwrap();
    assert!(removed);
    assert!(cache.item(item).unwrap().is_none());
    assert!(cache.indicators(item).unwrap().is_empty());
    assert!(cache.item(element).unwrap().unwrap().is_outdated);

    cache.update(PROJECT).unwrap();
    assert_eq!(value(&cache, root, "A1-3"), None);
}

#[test]
fn test_remove_element_components_keeps_listed() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    let (_, element, _) = store_component_tree(&mut cache, &component);

    let removed = cache
        .unit_of_work(|w| {
            w.store_component(PROJECT, VARIANT, ComponentId(2), element, &component)?;
            w.remove_element_components(VARIANT, element, &[ComponentId(2)])
        })
        .unwrap();

    assert_eq!(removed, 1);
    let children = cache.children(element).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].entity_id, 2);
}

#[test]
fn test_remove_stale_elements_drops_empty_types() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    store_component_tree(&mut cache, &component);

    let removed = cache
        .unit_of_work(|w| w.remove_stale_elements(VARIANT, &[]))
        .unwrap();
    assert_eq!(removed, 1);
    assert!(cache
        .items_of_kind(VARIANT, CacheItemKind::ElementType)
        .unwrap()
        .is_empty());
    assert!(cache.variant_root(VARIANT).unwrap().is_some());
}

#[test]
fn test_partial_leaf_flags_ancestors() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let complete = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    let incomplete = results(vec![entry(LifeCycleModule::C3, Some(2), 2.0)], 1.0);
    let element = cache
        .unit_of_work(|w| {
            let root = w.store_variant(PROJECT, &variant())?;
            let wall = w.store_element_type(PROJECT, VARIANT, ElementTypeNodeId(330), root)?;
            let element = w.store_element(PROJECT, VARIANT, &element(1), wall)?;
            let first = w.store_component(PROJECT, VARIANT, ComponentId(1), element, &complete)?;
            w.store_indicators(first, &complete, false, false)?;
            let second =
                w.store_component(PROJECT, VARIANT, ComponentId(2), element, &incomplete)?;
            w.store_indicators(second, &incomplete, false, true)?;
            Ok(element)
        })
        .unwrap();
    cache.update(PROJECT).unwrap();

    let flag = |rows: Vec<CachedIndicator>, module: &str| {
        rows.into_iter()
            .find(|r| r.life_cycle_ident == module)
            .map(|r| r.is_partial)
    };
    assert_eq!(flag(cache.indicators(element).unwrap(), "C3"), Some(true));
    assert_eq!(flag(cache.indicators(element).unwrap(), "A1-3"), Some(false));
    assert_eq!(flag(cache.indicators(element).unwrap(), "total"), Some(true));

    let totals = cache.variant_totals(VARIANT).unwrap();
    let root_flag = |module: &str| {
        totals
            .iter()
            .find(|t| t.life_cycle_ident == module)
            .map(|t| t.is_partial)
    };
    assert_eq!(root_flag("C3"), Some(true));
    assert_eq!(root_flag("A1-3"), Some(false));
    assert_eq!(root_flag("total"), Some(true));
}

#[test]
fn test_remove_stale_variants_drops_whole_tree() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    let (_, element, item) = store_component_tree(&mut cache, &component);
    let renamed = ProjectVariant {
        id: VariantId(11),
        ..variant()
    };
    cache
        .unit_of_work(|w| w.store_variant(PROJECT, &renamed))
        .unwrap();

    let removed = cache
        .unit_of_work(|w| w.remove_stale_variants(PROJECT, &[VariantId(11)]))
        .unwrap();

    assert_eq!(removed, 1);
    assert!(cache.variant_root(VARIANT).unwrap().is_none());
    assert!(cache.item(element).unwrap().is_none());
    assert!(cache.indicators(item).unwrap().is_empty());
    assert!(cache.variant_root(VariantId(11)).unwrap().is_some());
}

#[test]
fn test_prune_drops_missing_projects_and_digests() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    store_component_tree(&mut cache, &component);
    let other = ProjectVariant {
        id: VariantId(20),
        ..variant()
    };
    cache
        .unit_of_work(|w| w.store_variant(ProjectId(2), &other))
        .unwrap();
    cache.set_file_digest("projects/office.yaml", "a").unwrap();
    cache.set_file_digest("projects/school.yaml", "b").unwrap();

    let removed = cache
        .prune(&[ProjectId(2)], &["projects/school.yaml"])
        .unwrap();

    assert_eq!(removed, 1);
    assert!(cache.variant_root(VARIANT).unwrap().is_none());
    assert!(cache.variant_root(VariantId(20)).unwrap().is_some());
    assert_eq!(cache.file_digest("projects/office.yaml").unwrap(), None);
    assert_eq!(
        cache.file_digest("projects/school.yaml").unwrap().as_deref(),
        Some("b")
    );
}

#[test]
fn test_unit_of_work_rolls_back_on_error() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let err = cache
        .unit_of_work(|w| {
            w.store_variant(PROJECT, &variant())?;
            Err::<(), _>(LcaError::configuration("boom"))
        })
        .unwrap_err();

    assert!(matches!(err, LcaError::Configuration(_)));
    assert!(cache.variant_root(VARIANT).unwrap().is_none());
}

#[test]
fn test_clean_trees_are_not_recomputed() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    store_component_tree(&mut cache, &component);
    cache.update(PROJECT).unwrap();

    let stats = cache.update_project_variant(VARIANT).unwrap();
    assert_eq!(stats.items_recomputed, 0);
    assert_eq!(stats.leaves_refreshed, 0);
}

#[test]
fn test_update_element_type_tree() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
    let (root, _, item) = store_component_tree(&mut cache, &component);
    cache.update(PROJECT).unwrap();

    cache
        .unit_of_work(|w| {
            w.clear_indicators(item)?;
            w.store_indicator_results(item, &entry(LifeCycleModule::A13, Some(1), 7.5), false, false)
        })
        .unwrap();

    let stats = cache
        .update_element_type_tree(VARIANT, ElementTypeNodeId(330))
        .unwrap();
    assert!(stats.items_recomputed >= 2);
    assert!(close(value(&cache, root, "A1-3"), 7.5));
    assert!(close(value(&cache, root, "total"), 7.5));

    let missing = cache
        .update_element_type_tree(VARIANT, ElementTypeNodeId(999))
        .unwrap();
    assert_eq!(missing.variants, 0);
}

#[test]
fn test_component_totals_ordered_by_value() {
    let mut cache = LcaCache::open_in_memory().unwrap();
    let small = results(vec![entry(LifeCycleModule::A13, Some(1), 1.0)], 1.0);
    let large = results(vec![entry(LifeCycleModule::A13, Some(1), 9.0)], 3.0);
    let (_, element, _) = store_component_tree(&mut cache, &small);
    cache
        .unit_of_work(|w| {
            let item = w.store_component(PROJECT, VARIANT, ComponentId(2), element, &large)?;
            w.store_indicators(item, &large, false, false)
        })
        .unwrap();
    cache.update(PROJECT).unwrap();

    let totals = cache.component_totals(VARIANT, GWP).unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].component_id, 2);
    assert_eq!(totals[0].value, Some(9.0));
    assert_eq!(totals[0].element_id, Some(1));
}

#[test]
fn test_file_digests_persist() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("cache.db");
    {
        let cache = LcaCache::open_path(&path).unwrap();
        cache.set_file_digest("projects/office.yaml", &compute_hash("a")).unwrap();
    }

    let cache = LcaCache::open_path(&path).unwrap();
    assert_eq!(
        cache.file_digest("projects/office.yaml").unwrap(),
        Some(compute_hash("a"))
    );
    assert_eq!(cache.file_digest("projects/other.yaml").unwrap(), None);
}

#[test]
fn test_schema_version_mismatch_rebuilds() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("cache.db");
    {
        let mut cache = LcaCache::open_path(&path).unwrap();
        let component = results(vec![entry(LifeCycleModule::A13, Some(1), 5.0)], 1.0);
        store_component_tree(&mut cache, &component);
        cache
            .conn
            .execute("UPDATE schema_version SET version = 1", [])
            .unwrap();
    }

    let cache = LcaCache::open_path(&path).unwrap();
    assert_eq!(cache.statistics().unwrap().total_items, 0);
}

#[test]
fn test_query_raw_is_read_only() {
    let cache = LcaCache::open_in_memory().unwrap();
    assert!(cache.query_raw("DELETE FROM cache_items").is_err());
    let rows = cache.query_raw("SELECT COUNT(*) FROM cache_items").unwrap();
    assert_eq!(rows, vec![vec!["0".to_string()]]);
}

#[test]
fn test_compute_hash() {
    let hash1 = compute_hash("hello");
    let hash2 = compute_hash("hello");
    let hash3 = compute_hash("world");

    assert_eq!(hash1, hash2);
    assert_ne!(hash1, hash3);
    assert_eq!(hash1.len(), 64);
}
