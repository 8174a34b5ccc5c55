//! SQLite-backed result cache
//!
//! The cache mirrors every computed project variant as a tree of items:
//! variant → element type → element → component, plus energy flows and
//! transport means directly below the variant. Leaves hold the values
//! written by the processor, inner nodes hold sums maintained by
//! aggregation.
//!
//! - Every write runs inside [`LcaCache::unit_of_work`] (one transaction)
//! - Stores are upserts and flag the item outdated
//! - Only aggregation clears the outdated flag
//!
//! The cache is user-local and can always be rebuilt with `elca compute --force`.

mod aggregate;
mod queries;
mod schema;
mod store;
mod types;

pub use store::CacheWriter;
pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use miette::{IntoDiagnostic, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::core::identity::{ElementTypeNodeId, ProjectId, VariantId};
use crate::core::project::Project;
use crate::lca::error::LcaResult;

/// Cache file location within a project
pub const CACHE_FILE: &str = ".elca/cache.db";

/// Current schema version - cache is rebuilt on version mismatch
const SCHEMA_VERSION: i32 = 3;

/// The result cache backed by SQLite
pub struct LcaCache {
    conn: Connection,
    path: Option<PathBuf>,
}

impl LcaCache {
    /// Open or create the cache of a project
    pub fn open(project: &Project) -> Result<Self> {
        let cache_path = project.root().join(CACHE_FILE);

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }

        Ok(Self::open_path(&cache_path)?)
    }

    /// Open or create a cache file at `path`
    pub fn open_path(path: &Path) -> LcaResult<Self> {
        let needs_init = !path.exists();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut cache = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        cache.prepare(needs_init)?;
        Ok(cache)
    }

    /// Cache living in memory only
    pub fn open_in_memory() -> LcaResult<Self> {
        let mut cache = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        cache.prepare(true)?;
        Ok(cache)
    }

    fn prepare(&mut self, needs_init: bool) -> LcaResult<()> {
        self.conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        if needs_init {
            self.init_schema()?;
        } else if self.needs_schema_rebuild() {
            tracing::info!("cache schema changed, rebuilding");
            self.reinitialize_schema()?;
        }
        Ok(())
    }

    /// Check if schema version matches current version
    fn needs_schema_rebuild(&self) -> bool {
        let current_version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        current_version != SCHEMA_VERSION
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` in one transaction
    ///
    /// Commits when `f` succeeds. On error the transaction is rolled back
    /// and the error is returned unchanged.
    pub fn unit_of_work<T>(
        &mut self,
        f: impl FnOnce(&CacheWriter<'_>) -> LcaResult<T>,
    ) -> LcaResult<T> {
        let tx = self.conn.transaction()?;
        let result = f(&CacheWriter::new(&tx));
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "rolling back cache transaction");
                drop(tx);
                Err(err)
            }
        }
    }

    /// Recompute every variant tree of a project
    pub fn update(&mut self, project_id: ProjectId) -> LcaResult<AggregateStats> {
        self.unit_of_work(|w| w.update_project(project_id))
    }

    /// Recompute one variant tree
    pub fn update_project_variant(
        &mut self,
        variant_id: VariantId,
    ) -> LcaResult<AggregateStats> {
        self.unit_of_work(|w| w.update_variant(variant_id))
    }

    /// Recompute the subtree of an element type and its ancestors
    pub fn update_element_type_tree(
        &mut self,
        variant_id: VariantId,
        node_id: ElementTypeNodeId,
    ) -> LcaResult<AggregateStats> {
        self.unit_of_work(|w| w.update_element_type(variant_id, node_id))
    }

    /// Drop projects and file digests that no longer exist in the workspace
    ///
    /// Returns the number of removed projects.
    pub fn prune(&mut self, projects: &[ProjectId], files: &[&str]) -> LcaResult<usize> {
        self.unit_of_work(|w| {
            let removed = w.remove_stale_projects(projects)?;
            w.retain_file_digests(files)?;
            Ok(removed)
        })
    }

    /// Stored digest of a project file
    pub fn file_digest(&self, key: &str) -> LcaResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = ?1",
                params![format!("digest:{}", key)],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn set_file_digest(&self, key: &str, digest: &str) -> LcaResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?1, ?2)",
            params![format!("digest:{}", key), digest],
        )?;
        Ok(())
    }

    /// Get cache statistics
    pub fn statistics(&self) -> Result<CacheStats> {
        let total_items: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_items", [], |row| row.get(0))
            .into_diagnostic()?;

        let total_indicator_rows: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_indicators", [], |row| row.get(0))
            .into_diagnostic()?;

        let outdated_items: usize = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM cache_items WHERE is_outdated = 1",
                [],
                |row| row.get(0),
            )
            .into_diagnostic()?;

        let mut by_kind = std::collections::BTreeMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT kind, COUNT(*) FROM cache_items GROUP BY kind")
                .into_diagnostic()?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
                })
                .into_diagnostic()?;

            for row in rows {
                let (kind, count) = row.into_diagnostic()?;
                by_kind.insert(kind, count);
            }
        }

        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(CacheStats {
            total_items,
            total_indicator_rows,
            outdated_items,
            by_kind,
            db_size_bytes,
        })
    }

    /// Execute raw SQL query (read-only)
    pub fn query_raw(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(sql).into_diagnostic()?;
        if !stmt.readonly() {
            miette::bail!("only read-only queries are allowed");
        }
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: String = row
                        .get::<_, rusqlite::types::Value>(i)
                        .map(|v| match v {
                            rusqlite::types::Value::Null => "NULL".to_string(),
                            rusqlite::types::Value::Integer(i) => i.to_string(),
                            rusqlite::types::Value::Real(f) => f.to_string(),
                            rusqlite::types::Value::Text(s) => s,
                            rusqlite::types::Value::Blob(_) => "<blob>".to_string(),
                        })
                        .unwrap_or_default();
                    values.push(value);
                }
                Ok(values)
            })
            .into_diagnostic()?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Get column names for a query
    pub fn query_columns(&self, sql: &str) -> Result<Vec<String>> {
        let stmt = self.conn.prepare(sql).into_diagnostic()?;
        Ok(stmt.column_names().iter().map(|s| s.to_string()).collect())
    }

    /// Clear the entire cache
    pub fn clear(&mut self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            DELETE FROM cache_indicators;
            DELETE FROM cache_items;
            DELETE FROM cache_meta;
            "#,
            )
            .into_diagnostic()?;
        Ok(())
    }
}

/// Compute SHA256 hash of content
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parse datetime string to DateTime<Utc>
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;
