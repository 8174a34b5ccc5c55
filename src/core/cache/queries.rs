//! Read access for reports and the CLI

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row};

use super::{
    parse_datetime, CacheItem, CacheItemKind, CachedIndicator, ComponentTotal, LcaCache,
    ModuleTotal,
};
use crate::core::identity::{
    CacheItemId, IndicatorId, ProcessId, ProjectId, VariantId,
};
use crate::lca::error::{LcaError, LcaResult};

const ITEM_COLUMNS: &str = "id, parent_id, kind, entity_id, project_id, variant_id, is_outdated, \
     is_virtual, quantity, ref_unit, mass, num_replacements, modified";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<CacheItem> {
    let kind: String = row.get(2)?;
    let kind = kind.parse::<CacheItemKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(LcaError::configuration(e)),
        )
    })?;
    Ok(CacheItem {
        id: CacheItemId(row.get(0)?),
        parent_id: row.get::<_, Option<i64>>(1)?.map(CacheItemId),
        kind,
        entity_id: row.get(3)?,
        project_id: ProjectId(row.get(4)?),
        variant_id: VariantId(row.get(5)?),
        is_outdated: row.get(6)?,
        is_virtual: row.get(7)?,
        quantity: row.get(8)?,
        ref_unit: row.get(9)?,
        mass: row.get(10)?,
        num_replacements: row.get(11)?,
        modified: parse_datetime(row.get::<_, String>(12)?),
    })
}

impl LcaCache {
    /// Get an item by id
    pub fn item(&self, id: CacheItemId) -> LcaResult<Option<CacheItem>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM cache_items WHERE id = ?1", ITEM_COLUMNS),
                params![id.0],
                item_from_row,
            )
            .optional()?)
    }

    /// Get the item mirroring an entity of a variant
    pub fn find_item(
        &self,
        kind: CacheItemKind,
        entity_id: i64,
        variant_id: VariantId,
    ) -> LcaResult<Option<CacheItem>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM cache_items WHERE kind = ?1 AND entity_id = ?2 AND variant_id = ?3",
                    ITEM_COLUMNS
                ),
                params![kind.as_str(), entity_id, variant_id.raw()],
                item_from_row,
            )
            .optional()?)
    }

    pub fn variant_root(&self, variant_id: VariantId) -> LcaResult<Option<CacheItem>> {
        self.find_item(CacheItemKind::Variant, variant_id.raw(), variant_id)
    }

    /// Direct children of an item
    pub fn children(&self, id: CacheItemId) -> LcaResult<Vec<CacheItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cache_items WHERE parent_id = ?1 ORDER BY kind, entity_id",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![id.0], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// All items of a variant of one kind
    pub fn items_of_kind(
        &self,
        variant_id: VariantId,
        kind: CacheItemKind,
    ) -> LcaResult<Vec<CacheItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cache_items WHERE variant_id = ?1 AND kind = ?2 ORDER BY entity_id",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![variant_id.raw(), kind.as_str()], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Stored rows of an item
    pub fn indicators(&self, id: CacheItemId) -> LcaResult<Vec<CachedIndicator>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT life_cycle_ident, indicator_id, process_id, value, ratio, is_partial
               FROM cache_indicators
               WHERE item_id = ?1
               ORDER BY life_cycle_ident, indicator_id, process_id"#,
        )?;
        let rows = stmt
            .query_map(params![id.0], |row| {
                let process_id: u32 = row.get(2)?;
                Ok(CachedIndicator {
                    life_cycle_ident: row.get(0)?,
                    indicator_id: IndicatorId(row.get(1)?),
                    process_id: (process_id != 0).then_some(ProcessId(process_id)),
                    value: row.get(3)?,
                    ratio: row.get(4)?,
                    is_partial: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Value of one row, if stored
    pub fn indicator_value(
        &self,
        id: CacheItemId,
        life_cycle_ident: &str,
        indicator_id: IndicatorId,
        process_id: Option<ProcessId>,
    ) -> LcaResult<Option<f64>> {
        Ok(self
            .conn
            .query_row(
                r#"SELECT value FROM cache_indicators
                   WHERE item_id = ?1 AND life_cycle_ident = ?2 AND indicator_id = ?3
                     AND process_id = ?4"#,
                params![
                    id.0,
                    life_cycle_ident,
                    indicator_id.raw(),
                    process_id.map(|p| p.raw()).unwrap_or(0)
                ],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()?
            .flatten())
    }

    /// Aggregated rows of a variant root, per module and indicator
    pub fn variant_totals(&self, variant_id: VariantId) -> LcaResult<Vec<ModuleTotal>> {
        let Some(root) = self.variant_root(variant_id)? else {
            return Ok(Vec::new());
        };
        let mut stmt = self.conn.prepare(
            r#"SELECT life_cycle_ident, indicator_id, SUM(value), MAX(is_partial)
               FROM cache_indicators
               WHERE item_id = ?1
               GROUP BY life_cycle_ident, indicator_id
               ORDER BY life_cycle_ident, indicator_id"#,
        )?;
        let rows = stmt
            .query_map(params![root.id.0], |row| {
                Ok(ModuleTotal {
                    life_cycle_ident: row.get(0)?,
                    indicator_id: IndicatorId(row.get(1)?),
                    value: row.get(2)?,
                    is_partial: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `total` per indicator summed over all items of one kind
    ///
    /// Used for virtual items such as reference models, which never reach
    /// the variant root.
    pub fn kind_totals(
        &self,
        variant_id: VariantId,
        kind: CacheItemKind,
    ) -> LcaResult<BTreeMap<IndicatorId, f64>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT i.indicator_id, SUM(i.value)
               FROM cache_indicators i
               JOIN cache_items c ON c.id = i.item_id
               WHERE c.variant_id = ?1 AND c.kind = ?2 AND i.life_cycle_ident = 'total'
               GROUP BY i.indicator_id"#,
        )?;
        let rows = stmt
            .query_map(params![variant_id.raw(), kind.as_str()], |row| {
                Ok((IndicatorId(row.get(0)?), row.get::<_, Option<f64>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, value)| value.map(|v| (id, v)))
            .collect())
    }

    /// Per-component totals of one indicator, largest first
    pub fn component_totals(
        &self,
        variant_id: VariantId,
        indicator_id: IndicatorId,
    ) -> LcaResult<Vec<ComponentTotal>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT c.id, c.entity_id, p.entity_id, c.mass, c.num_replacements, i.value
               FROM cache_items c
               LEFT JOIN cache_items p ON p.id = c.parent_id
               LEFT JOIN cache_indicators i
                      ON i.item_id = c.id AND i.life_cycle_ident = 'total' AND i.indicator_id = ?2
               WHERE c.variant_id = ?1 AND c.kind = ?3
               ORDER BY i.value DESC, c.entity_id"#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    variant_id.raw(),
                    indicator_id.raw(),
                    CacheItemKind::Component.as_str()
                ],
                |row| {
                    Ok(ComponentTotal {
                        item_id: CacheItemId(row.get(0)?),
                        component_id: row.get(1)?,
                        element_id: row.get(2)?,
                        mass: row.get(3)?,
                        num_replacements: row.get(4)?,
                        value: row.get(5)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Variants cached for a project
    pub fn variants(&self, project_id: ProjectId) -> LcaResult<Vec<VariantId>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id FROM cache_items WHERE project_id = ?1 AND kind = ?2 ORDER BY entity_id",
        )?;
        let rows = stmt
            .query_map(
                params![project_id.raw(), CacheItemKind::Variant.as_str()],
                |row| row.get::<_, u32>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(VariantId).collect())
    }

    /// Number of outdated items of a variant
    pub fn outdated_count(&self, variant_id: VariantId) -> LcaResult<usize> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM cache_items WHERE variant_id = ?1 AND is_outdated = 1",
            params![variant_id.raw()],
            |row| row.get(0),
        )?)
    }
}
