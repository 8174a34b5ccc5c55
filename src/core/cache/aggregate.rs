//! Bottom-up reaggregation of cache trees
//!
//! A variant tree is loaded into an arena and walked children-first. Inner
//! nodes are rebuilt from their non-virtual children whenever they or any
//! descendant are outdated; leaves only get their `total` row refreshed.

use std::collections::HashMap;
use std::time::Instant;

use rusqlite::params;

use super::{AggregateStats, CacheItemKind, CacheWriter};
use crate::core::identity::{ElementTypeNodeId, ProjectId, VariantId};
use crate::entities::process::LifeCycleModule;
use crate::lca::error::LcaResult;

fn is_container(kind: &str) -> bool {
    matches!(
        kind.parse::<CacheItemKind>(),
        Ok(CacheItemKind::Variant | CacheItemKind::ElementType | CacheItemKind::Element)
    )
}

struct Node {
    id: i64,
    parent: Option<usize>,
    children: Vec<usize>,
    is_outdated: bool,
    /// Variant, element type or element; rebuilt from children even when empty
    is_container: bool,
}

/// Arena of one variant tree
struct Tree {
    nodes: Vec<Node>,
    index: HashMap<i64, usize>,
}

impl Tree {
    fn load(writer: &CacheWriter<'_>, variant_id: VariantId) -> LcaResult<Self> {
        let mut stmt = writer.conn.prepare(
            "SELECT id, parent_id, is_outdated, kind FROM cache_items WHERE variant_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![variant_id.raw()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut nodes = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());
        for (i, (id, _, is_outdated, kind)) in rows.iter().enumerate() {
            index.insert(*id, i);
            nodes.push(Node {
                id: *id,
                parent: None,
                children: Vec::new(),
                is_outdated: *is_outdated,
                is_container: is_container(kind),
            });
        }
        for (i, (_, parent_id, _, _)) in rows.iter().enumerate() {
            if let Some(parent) = parent_id.and_then(|p| index.get(&p).copied()) {
                nodes[i].parent = Some(parent);
                nodes[parent].children.push(i);
            }
        }

        Ok(Self { nodes, index })
    }

    fn roots(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|i| self.nodes[*i].parent.is_none())
            .collect()
    }

    /// Nodes below and including `start`, every child before its parent
    fn children_first(&self, start: &[usize]) -> Vec<usize> {
        let mut pre_order = Vec::new();
        let mut stack: Vec<usize> = start.to_vec();
        while let Some(i) = stack.pop() {
            pre_order.push(i);
            stack.extend(self.nodes[i].children.iter().copied());
        }
        pre_order.reverse();
        pre_order
    }

    fn ancestors(&self, i: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = self.nodes[i].parent;
        while let Some(p) = current {
            if chain.contains(&p) {
                break;
            }
            chain.push(p);
            current = self.nodes[p].parent;
        }
        chain
    }
}

/// Module idents summed into the `total` row
fn total_modules() -> String {
    LifeCycleModule::all()
        .iter()
        .filter(|m| m.counts_towards_total())
        .map(|m| format!("'{}'", m.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'c> CacheWriter<'c> {
    /// Recompute every variant tree of a project
    pub fn update_project(&self, project_id: ProjectId) -> LcaResult<AggregateStats> {
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT variant_id FROM cache_items WHERE project_id = ?1")?;
        let variants = stmt
            .query_map(params![project_id.raw()], |row| row.get::<_, u32>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = AggregateStats::default();
        for variant in variants {
            let variant_stats = self.update_variant(VariantId(variant))?;
            stats.variants += variant_stats.variants;
            stats.items_recomputed += variant_stats.items_recomputed;
            stats.leaves_refreshed += variant_stats.leaves_refreshed;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            project = %project_id,
            variants = stats.variants,
            recomputed = stats.items_recomputed,
            "cache aggregated"
        );
        Ok(stats)
    }

    /// Recompute one variant tree
    pub fn update_variant(&self, variant_id: VariantId) -> LcaResult<AggregateStats> {
        let start = Instant::now();
        let tree = Tree::load(self, variant_id)?;
        let order = tree.children_first(&tree.roots());

        let mut stats = AggregateStats {
            variants: 1,
            ..Default::default()
        };
        self.aggregate_nodes(&tree, &order, &mut vec![false; tree.nodes.len()], &mut stats)?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Recompute the subtree of one element type, then its ancestors
    pub fn update_element_type(
        &self,
        variant_id: VariantId,
        node_id: ElementTypeNodeId,
    ) -> LcaResult<AggregateStats> {
        let start = Instant::now();
        let mut stats = AggregateStats::default();

        let Some(item) = self.item_id(CacheItemKind::ElementType, node_id.raw(), variant_id)? else {
            tracing::debug!(variant = %variant_id, node = %node_id, "element type not cached");
            return Ok(stats);
        };

        let tree = Tree::load(self, variant_id)?;
        let Some(&start_index) = tree.index.get(&item.0) else {
            return Ok(stats);
        };

        let mut dirty = vec![false; tree.nodes.len()];
        let order = tree.children_first(&[start_index]);
        self.aggregate_nodes(&tree, &order, &mut dirty, &mut stats)?;

        for ancestor in tree.ancestors(start_index) {
            self.recompute_inner(tree.nodes[ancestor].id)?;
            stats.items_recomputed += 1;
        }

        stats.variants = 1;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    fn aggregate_nodes(
        &self,
        tree: &Tree,
        order: &[usize],
        dirty: &mut [bool],
        stats: &mut AggregateStats,
    ) -> LcaResult<()> {
        for &i in order {
            let node = &tree.nodes[i];
            dirty[i] = node.is_outdated || node.children.iter().any(|c| dirty[*c]);
            if !dirty[i] {
                continue;
            }

            if node.children.is_empty() && !node.is_container {
                self.refresh_leaf(node.id)?;
                stats.leaves_refreshed += 1;
            } else {
                self.recompute_inner(node.id)?;
                stats.items_recomputed += 1;
            }
        }
        Ok(())
    }

    /// Rebuild the `total` row of a leaf and clear its outdated flag
    fn refresh_leaf(&self, item: i64) -> LcaResult<()> {
        self.conn.execute(
            "DELETE FROM cache_indicators WHERE item_id = ?1 AND life_cycle_ident = 'total'",
            params![item],
        )?;
        self.write_total(item)?;
        self.conn.execute(
            "UPDATE cache_items SET is_outdated = 0 WHERE id = ?1",
            params![item],
        )?;
        Ok(())
    }

    /// Rebuild all rows of an inner node from its non-virtual children
    fn recompute_inner(&self, item: i64) -> LcaResult<()> {
        self.conn
            .execute("DELETE FROM cache_indicators WHERE item_id = ?1", params![item])?;

        self.conn.execute(
            r#"INSERT INTO cache_indicators
                   (item_id, life_cycle_ident, indicator_id, process_id, value, ratio, is_partial)
               SELECT ?1, i.life_cycle_ident, i.indicator_id, 0, SUM(i.value), 1, MAX(i.is_partial)
               FROM cache_indicators i
               JOIN cache_items c ON c.id = i.item_id
               WHERE c.parent_id = ?1 AND c.is_virtual = 0 AND i.life_cycle_ident != 'total'
               GROUP BY i.life_cycle_ident, i.indicator_id"#,
            params![item],
        )?;
        self.write_total(item)?;

        self.conn.execute(
            r#"UPDATE cache_items SET
                   mass = (SELECT SUM(mass) FROM cache_items WHERE parent_id = ?1 AND is_virtual = 0),
                   is_outdated = 0
               WHERE id = ?1"#,
            params![item],
        )?;
        Ok(())
    }

    fn write_total(&self, item: i64) -> LcaResult<()> {
        let sql = format!(
            r#"INSERT INTO cache_indicators
                   (item_id, life_cycle_ident, indicator_id, process_id, value, ratio, is_partial)
               SELECT ?1, 'total', indicator_id, 0, SUM(value), 1, MAX(is_partial)
               FROM cache_indicators
               WHERE item_id = ?1 AND life_cycle_ident IN ({})
               GROUP BY indicator_id"#,
            total_modules()
        );
        self.conn.execute(&sql, params![item])?;
        Ok(())
    }
}
