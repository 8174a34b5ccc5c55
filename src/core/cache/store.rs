//! Writes to the cache tree
//!
//! All methods run on the connection of an open transaction, see
//! [`LcaCache::unit_of_work`](super::LcaCache::unit_of_work).

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{CacheItemKind, NewItem};
use crate::core::identity::{
    CacheItemId, ComponentId, ElementId, ElementTypeNodeId, FinalEnergyDemandId,
    FinalEnergyRefModelId, FinalEnergySupplyId, ProjectId, TransportMeanId, VariantId,
};
use crate::entities::element::Element;
use crate::entities::variant::ProjectVariant;
use crate::lca::error::LcaResult;
use crate::lca::life_cycle_results::ProcessLifeCycleLcaResults;
use crate::lca::result::IndicatorResults;

/// Write access to the cache within one transaction
pub struct CacheWriter<'c> {
    pub(super) conn: &'c Connection,
}

impl<'c> CacheWriter<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert or update an item, flagging it outdated
    pub fn upsert_item(&self, item: &NewItem) -> LcaResult<CacheItemId> {
        let id: i64 = self.conn.query_row(
            r#"INSERT INTO cache_items
                   (parent_id, kind, entity_id, project_id, variant_id, is_outdated, is_virtual,
                    quantity, ref_unit, mass, num_replacements, modified)
               VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8, ?9, ?10, ?11)
               ON CONFLICT (kind, entity_id, variant_id) DO UPDATE SET
                   parent_id = excluded.parent_id,
                   project_id = excluded.project_id,
                   is_outdated = 1,
                   is_virtual = excluded.is_virtual,
                   quantity = excluded.quantity,
                   ref_unit = excluded.ref_unit,
                   mass = excluded.mass,
                   num_replacements = excluded.num_replacements,
                   modified = excluded.modified
               RETURNING id"#,
            params![
                item.parent_id.map(|p| p.0),
                item.kind.as_str(),
                item.entity_id,
                item.project_id.raw(),
                item.variant_id.raw(),
                item.kind.is_virtual(),
                item.quantity,
                item.ref_unit,
                item.mass,
                item.num_replacements,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        tracing::debug!(kind = %item.kind, entity = item.entity_id, item = id, "stored cache item");
        Ok(CacheItemId(id))
    }

    /// Id of an existing item
    pub fn item_id(
        &self,
        kind: CacheItemKind,
        entity_id: i64,
        variant_id: VariantId,
    ) -> LcaResult<Option<CacheItemId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM cache_items WHERE kind = ?1 AND entity_id = ?2 AND variant_id = ?3",
                params![kind.as_str(), entity_id, variant_id.raw()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(CacheItemId))
    }

    pub fn mark_outdated(&self, item: CacheItemId) -> LcaResult<()> {
        self.conn.execute(
            "UPDATE cache_items SET is_outdated = 1 WHERE id = ?1",
            params![item.0],
        )?;
        Ok(())
    }

    // =====================================================================
    // Stores
    // =====================================================================

    /// Root item of a variant tree
    pub fn store_variant(
        &self,
        project_id: ProjectId,
        variant: &ProjectVariant,
    ) -> LcaResult<CacheItemId> {
        let item = NewItem::new(
            CacheItemKind::Variant,
            variant.id.raw(),
            project_id,
            variant.id,
            None,
        )
        .with_quantity(variant.ngf, "m2");
        self.upsert_item(&item)
    }

    pub fn store_element_type(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        node_id: ElementTypeNodeId,
        parent: CacheItemId,
    ) -> LcaResult<CacheItemId> {
        let item = NewItem::new(
            CacheItemKind::ElementType,
            node_id.raw(),
            project_id,
            variant_id,
            Some(parent),
        );
        self.upsert_item(&item)
    }

    /// Placeholder for an element
    ///
    /// The quantity and reference unit come from the input model and are
    /// authoritative. Mass starts at 0 and is back-filled from the children
    /// by aggregation.
    pub fn store_element(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        element: &Element,
        parent: CacheItemId,
    ) -> LcaResult<CacheItemId> {
        let item = NewItem::new(
            CacheItemKind::Element,
            element.id.raw(),
            project_id,
            variant_id,
            Some(parent),
        )
        .with_quantity(element.quantity, element.ref_unit.as_str())
        .with_mass(Some(0.0));
        self.upsert_item(&item)
    }

    pub fn store_component(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        component_id: ComponentId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        self.store_leaf(
            CacheItemKind::Component,
            component_id.raw(),
            project_id,
            variant_id,
            parent,
            results,
        )
    }

    /// Avoided production impact of an extant component
    pub fn store_extant_savings(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        component_id: ComponentId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        self.store_leaf(
            CacheItemKind::ExtantSavings,
            component_id.raw(),
            project_id,
            variant_id,
            parent,
            results,
        )
    }

    pub fn store_final_energy_demand(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        demand_id: FinalEnergyDemandId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        self.store_leaf(
            CacheItemKind::FinalEnergyDemand,
            demand_id.raw(),
            project_id,
            variant_id,
            parent,
            results,
        )
    }

    pub fn store_final_energy_supply(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        supply_id: FinalEnergySupplyId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        self.store_leaf(
            CacheItemKind::FinalEnergySupply,
            supply_id.raw(),
            project_id,
            variant_id,
            parent,
            results,
        )
    }

    pub fn store_final_energy_ref_model(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        ref_model_id: FinalEnergyRefModelId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        self.store_leaf(
            CacheItemKind::FinalEnergyRefModel,
            ref_model_id.raw(),
            project_id,
            variant_id,
            parent,
            results,
        )
    }

    pub fn store_transport_mean(
        &self,
        project_id: ProjectId,
        variant_id: VariantId,
        mean_id: TransportMeanId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        self.store_leaf(
            CacheItemKind::TransportMean,
            mean_id.raw(),
            project_id,
            variant_id,
            parent,
            results,
        )
    }

    fn store_leaf(
        &self,
        kind: CacheItemKind,
        entity_id: i64,
        project_id: ProjectId,
        variant_id: VariantId,
        parent: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
    ) -> LcaResult<CacheItemId> {
        let quantity = results.quantity();
        let item = NewItem::new(kind, entity_id, project_id, variant_id, Some(parent))
            .with_quantity(quantity.value, quantity.unit.as_str())
            .with_mass(results.mass())
            .with_replacements(results.num_replacements());
        self.upsert_item(&item)
    }

    // =====================================================================
    // Indicator rows
    // =====================================================================

    /// Store every entry of `results` on `item`
    pub fn store_indicators(
        &self,
        item: CacheItemId,
        results: &ProcessLifeCycleLcaResults,
        zero_values: bool,
        is_partial: bool,
    ) -> LcaResult<()> {
        for (_, entry) in results.iter() {
            self.store_indicator_results(item, entry, zero_values, is_partial)?;
        }
        Ok(())
    }

    /// Upsert one row per indicator of `results`
    ///
    /// `zero_values` stores 0 instead of the computed value while keeping
    /// the indicator tracked.
    pub fn store_indicator_results(
        &self,
        item: CacheItemId,
        results: &IndicatorResults,
        zero_values: bool,
        is_partial: bool,
    ) -> LcaResult<()> {
        let mut stmt = self.conn.prepare_cached(
            r#"INSERT INTO cache_indicators
                   (item_id, life_cycle_ident, indicator_id, process_id, value, ratio, is_partial)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT (item_id, life_cycle_ident, indicator_id, process_id) DO UPDATE SET
                   value = excluded.value,
                   ratio = excluded.ratio,
                   is_partial = excluded.is_partial"#,
        )?;

        let module = results.module();
        let process_id = results.process_id().map(|p| p.raw()).unwrap_or(0);
        for result in results.iter() {
            let value = if zero_values { Some(0.0) } else { result.value };
            stmt.execute(params![
                item.0,
                module.as_str(),
                result.indicator_id.raw(),
                process_id,
                value,
                results.ratio(),
                is_partial,
            ])?;
        }

        self.mark_outdated(item)
    }

    /// Drop all rows of an item before it is rewritten
    pub fn clear_indicators(&self, item: CacheItemId) -> LcaResult<()> {
        self.conn.execute(
            "DELETE FROM cache_indicators WHERE item_id = ?1",
            params![item.0],
        )?;
        Ok(())
    }

    // =====================================================================
    // Removal
    // =====================================================================

    /// Delete an item with its subtree, flagging the parent outdated
    pub fn remove_item(&self, item: CacheItemId) -> LcaResult<()> {
        let parent: Option<i64> = self
            .conn
            .query_row(
                "SELECT parent_id FROM cache_items WHERE id = ?1",
                params![item.0],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        // rows and children go with the item
        self.conn
            .execute("DELETE FROM cache_items WHERE id = ?1", params![item.0])?;

        if let Some(parent) = parent {
            self.mark_outdated(CacheItemId(parent))?;
        }
        Ok(())
    }

    fn remove_by_entity(
        &self,
        kind: CacheItemKind,
        entity_id: i64,
        variant_id: VariantId,
    ) -> LcaResult<bool> {
        match self.item_id(kind, entity_id, variant_id)? {
            Some(item) => {
                self.remove_item(item)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove_element(&self, variant_id: VariantId, element_id: ElementId) -> LcaResult<bool> {
        self.remove_by_entity(CacheItemKind::Element, element_id.raw(), variant_id)
    }

    pub fn remove_component(
        &self,
        variant_id: VariantId,
        component_id: ComponentId,
    ) -> LcaResult<bool> {
        self.remove_extant_savings(variant_id, component_id)?;
        self.remove_by_entity(CacheItemKind::Component, component_id.raw(), variant_id)
    }

    pub fn remove_extant_savings(
        &self,
        variant_id: VariantId,
        component_id: ComponentId,
    ) -> LcaResult<bool> {
        self.remove_by_entity(CacheItemKind::ExtantSavings, component_id.raw(), variant_id)
    }

    /// Remove all component items below `element_item` except `keep`
    ///
    /// Returns the number of removed components.
    pub fn remove_element_components(
        &self,
        variant_id: VariantId,
        element_item: CacheItemId,
        keep: &[ComponentId],
    ) -> LcaResult<usize> {
        let existing = self.child_entities(element_item, CacheItemKind::Component)?;
        let mut removed = 0;
        for entity_id in existing {
            if keep.iter().any(|c| c.raw() == entity_id) {
                continue;
            }
            if let Ok(id) = u32::try_from(entity_id) {
                self.remove_component(variant_id, ComponentId(id))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove sub-element items of a composite that are no longer present
    pub fn remove_sub_elements(
        &self,
        variant_id: VariantId,
        element_item: CacheItemId,
        keep: &[ElementId],
    ) -> LcaResult<usize> {
        let existing = self.child_entities(element_item, CacheItemKind::Element)?;
        let mut removed = 0;
        for entity_id in existing {
            if keep.iter().any(|e| e.raw() == entity_id) {
                continue;
            }
            if let Ok(id) = u32::try_from(entity_id) {
                self.remove_element(variant_id, ElementId(id))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn remove_final_energy_demands(&self, variant_id: VariantId) -> LcaResult<usize> {
        self.remove_kind(variant_id, CacheItemKind::FinalEnergyDemand)
    }

    pub fn remove_final_energy_supplies(&self, variant_id: VariantId) -> LcaResult<usize> {
        self.remove_kind(variant_id, CacheItemKind::FinalEnergySupply)
    }

    pub fn remove_final_energy_ref_models(&self, variant_id: VariantId) -> LcaResult<usize> {
        self.remove_kind(variant_id, CacheItemKind::FinalEnergyRefModel)
    }

    pub fn remove_transport_means(&self, variant_id: VariantId) -> LcaResult<usize> {
        self.remove_kind(variant_id, CacheItemKind::TransportMean)
    }

    /// Remove top-level elements and element types of a variant that are
    /// not in `keep`
    pub fn remove_stale_elements(
        &self,
        variant_id: VariantId,
        keep: &[ElementId],
    ) -> LcaResult<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id FROM cache_items WHERE variant_id = ?1 AND kind = ?2",
        )?;
        let existing = stmt
            .query_map(
                params![variant_id.raw(), CacheItemKind::Element.as_str()],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut removed = 0;
        for entity_id in existing {
            if keep.iter().any(|e| e.raw() == entity_id) {
                continue;
            }
            if let Ok(id) = u32::try_from(entity_id) {
                if self.remove_element(variant_id, ElementId(id))? {
                    removed += 1;
                }
            }
        }

        // element types left without any element
        let mut stmt = self.conn.prepare(
            "SELECT id FROM cache_items WHERE variant_id = ?1 AND kind = ?2",
        )?;
        let type_items = stmt
            .query_map(
                params![variant_id.raw(), CacheItemKind::ElementType.as_str()],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        for type_item in type_items {
            let elements: i64 = self.conn.query_row(
                r#"WITH RECURSIVE below(id) AS (
                       SELECT id FROM cache_items WHERE parent_id = ?1
                       UNION ALL
                       SELECT c.id FROM cache_items c JOIN below b ON c.parent_id = b.id
                   )
                   SELECT COUNT(*) FROM below JOIN cache_items i ON i.id = below.id
                   WHERE i.kind = ?2"#,
                params![type_item, CacheItemKind::Element.as_str()],
                |row| row.get(0),
            )?;
            if elements == 0 {
                self.remove_item(CacheItemId(type_item))?;
            }
        }
        Ok(removed)
    }

    /// Remove the trees of variants of `project_id` that are not in `keep`
    ///
    /// Returns the number of removed variants.
    pub fn remove_stale_variants(
        &self,
        project_id: ProjectId,
        keep: &[VariantId],
    ) -> LcaResult<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT variant_id FROM cache_items WHERE project_id = ?1",
        )?;
        let existing = stmt
            .query_map(params![project_id.raw()], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut removed = 0;
        for variant_id in existing {
            if keep.iter().any(|v| v.raw() == variant_id) {
                continue;
            }
            self.conn.execute(
                "DELETE FROM cache_items WHERE project_id = ?1 AND variant_id = ?2",
                params![project_id.raw(), variant_id],
            )?;
            tracing::debug!(project = %project_id, variant_id, "removed stale variant");
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove every item of projects that are not in `keep`
    ///
    /// Returns the number of removed projects.
    pub fn remove_stale_projects(&self, keep: &[ProjectId]) -> LcaResult<usize> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT project_id FROM cache_items")?;
        let existing = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut removed = 0;
        for project_id in existing {
            if keep.iter().any(|p| p.raw() == project_id) {
                continue;
            }
            self.conn.execute(
                "DELETE FROM cache_items WHERE project_id = ?1",
                params![project_id],
            )?;
            tracing::debug!(project_id, "removed stale project");
            removed += 1;
        }
        Ok(removed)
    }

    /// Drop stored file digests whose key is not in `keep`
    pub fn retain_file_digests(&self, keep: &[&str]) -> LcaResult<usize> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM cache_meta WHERE key LIKE 'digest:%'")?;
        let existing = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut removed = 0;
        for key in existing {
            let file = key.trim_start_matches("digest:");
            if keep.contains(&file) {
                continue;
            }
            removed += self
                .conn
                .execute("DELETE FROM cache_meta WHERE key = ?1", params![key])?;
        }
        Ok(removed)
    }

    fn remove_kind(&self, variant_id: VariantId, kind: CacheItemKind) -> LcaResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM cache_items WHERE variant_id = ?1 AND kind = ?2",
            params![variant_id.raw(), kind.as_str()],
        )?;
        if removed > 0 {
            self.conn.execute(
                "UPDATE cache_items SET is_outdated = 1 WHERE variant_id = ?1 AND kind = ?2",
                params![variant_id.raw(), CacheItemKind::Variant.as_str()],
            )?;
        }
        Ok(removed)
    }

    fn child_entities(&self, parent: CacheItemId, kind: CacheItemKind) -> LcaResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT entity_id FROM cache_items WHERE parent_id = ?1 AND kind = ?2")?;
        let rows = stmt
            .query_map(params![parent.0, kind.as_str()], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
