//! Database schema initialization

use rusqlite::params;

use super::{LcaCache, SCHEMA_VERSION};
use crate::lca::error::LcaResult;

impl LcaCache {
    /// Initialize database schema
    pub(super) fn init_schema(&mut self) -> LcaResult<()> {
        self.conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Tree of cached items, one per (kind, entity, variant)
            CREATE TABLE IF NOT EXISTS cache_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER REFERENCES cache_items(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                project_id INTEGER NOT NULL,
                variant_id INTEGER NOT NULL,
                is_outdated INTEGER NOT NULL DEFAULT 1,
                is_virtual INTEGER NOT NULL DEFAULT 0,
                quantity REAL,
                ref_unit TEXT,
                mass REAL,
                num_replacements INTEGER,
                modified TEXT NOT NULL,
                UNIQUE (kind, entity_id, variant_id)
            );
            CREATE INDEX IF NOT EXISTS idx_cache_items_parent ON cache_items(parent_id);
            CREATE INDEX IF NOT EXISTS idx_cache_items_variant ON cache_items(variant_id);
            CREATE INDEX IF NOT EXISTS idx_cache_items_project ON cache_items(project_id);

            -- Indicator values; process_id 0 marks aggregated rows
            CREATE TABLE IF NOT EXISTS cache_indicators (
                item_id INTEGER NOT NULL REFERENCES cache_items(id) ON DELETE CASCADE,
                life_cycle_ident TEXT NOT NULL,
                indicator_id INTEGER NOT NULL,
                process_id INTEGER NOT NULL DEFAULT 0,
                value REAL,
                ratio REAL NOT NULL DEFAULT 1,
                is_partial INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (item_id, life_cycle_ident, indicator_id, process_id)
            );
            CREATE INDEX IF NOT EXISTS idx_cache_indicators_indicator ON cache_indicators(indicator_id);

            -- Project file digests for change detection
            CREATE TABLE IF NOT EXISTS cache_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Drop all tables and reinitialize schema
    pub(super) fn reinitialize_schema(&mut self) -> LcaResult<()> {
        self.conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS cache_indicators;
            DROP TABLE IF EXISTS cache_items;
            DROP TABLE IF EXISTS cache_meta;
            DROP TABLE IF EXISTS schema_version;
            "#,
        )?;
        self.init_schema()
    }
}
