//! `elca cache` command - Inspect and maintain the result cache
//!
//! The cache is a local SQLite database that stores:
//! - One item per computed variant, element type, element, component,
//!   energy flow and transport mean
//! - Indicator values per item, life cycle module and process
//! - Digests of the project files computed last
//!
//! The cache is user-local (gitignored) and can be rebuilt with
//! `elca compute --force`.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;

use crate::cli::args::OutputFormat;
use crate::cli::helpers::{escape_csv, format_value, open_workspace};
use crate::cli::GlobalOpts;
use crate::core::cache::{AggregateStats, LcaCache, CACHE_FILE};
use crate::core::config::Config;
use crate::core::identity::{CacheItemId, ElementTypeNodeId, IndicatorId, ProjectId, VariantId};
use crate::core::loader::{load_projects, Dataset};

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Reaggregate outdated items
    Update {
        /// Only this project (PRJ-1 or 1)
        #[arg(long)]
        project: Option<ProjectId>,

        /// Only this variant (VAR-10 or 10)
        #[arg(long, conflicts_with = "project")]
        variant: Option<VariantId>,

        /// Only the subtree of this element type (requires --variant)
        #[arg(long, requires = "variant")]
        element_type: Option<ElementTypeNodeId>,
    },

    /// Show cache statistics
    Status,

    /// Show one cache item with its children and indicator rows
    Show {
        /// Cache item id (CI-5 or 5)
        item: CacheItemId,
    },

    /// Execute SQL query against cache (read-only, TSV unless --format is given)
    Query {
        /// SQL query to execute
        sql: String,
    },

    /// Clear the cache completely
    Clear,
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CacheCommands::Update {
            project,
            variant,
            element_type,
        } => run_update(project, variant, element_type, global),
        CacheCommands::Status => run_status(global),
        CacheCommands::Show { item } => run_show(item, global),
        CacheCommands::Query { sql } => run_query(&sql, global),
        CacheCommands::Clear => run_clear(global),
    }
}

fn run_update(
    project: Option<ProjectId>,
    variant: Option<VariantId>,
    element_type: Option<ElementTypeNodeId>,
    global: &GlobalOpts,
) -> Result<()> {
    let workspace = open_workspace(global)?;
    let mut cache = LcaCache::open(&workspace)?;

    let total = match (variant, element_type) {
        (Some(variant_id), Some(node_id)) => cache.update_element_type_tree(variant_id, node_id)?,
        (Some(variant_id), None) => cache.update_project_variant(variant_id)?,
        (None, _) => {
            let config = Config::load_for(Some(&workspace));
            let files = load_projects(&workspace, config.default_life_time)?;
            let ids: Vec<ProjectId> = match project {
                Some(id) => vec![id],
                None => files.iter().map(|f| f.project.id).collect(),
            };
            let mut total = AggregateStats::default();
            for id in ids {
                let stats = cache.update(id)?;
                total.variants += stats.variants;
                total.items_recomputed += stats.items_recomputed;
                total.leaves_refreshed += stats.leaves_refreshed;
                total.duration_ms += stats.duration_ms;
            }
            total
        }
    };

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&total).into_diagnostic()?);
        return Ok(());
    }

    if total.items_recomputed == 0 && total.leaves_refreshed == 0 {
        println!("{} Cache is up to date", style("✓").green());
    } else {
        println!(
            "{} Cache updated in {}ms",
            style("✓").green(),
            total.duration_ms
        );
        println!("  Variants:          {}", total.variants);
        println!("  Items recomputed:  {}", style(total.items_recomputed).yellow());
        println!("  Leaves refreshed:  {}", style(total.leaves_refreshed).yellow());
    }
    Ok(())
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let cache = LcaCache::open(&workspace)?;
    let stats = cache.statistics()?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&stats).into_diagnostic()?);
            return Ok(());
        }
        _ => {}
    }

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!(
        "  Location:        {}",
        workspace.root().join(CACHE_FILE).display()
    );
    println!("  Total items:     {}", style(stats.total_items).cyan());
    println!("  Indicator rows:  {}", style(stats.total_indicator_rows).cyan());
    let outdated = if stats.outdated_items > 0 {
        style(stats.outdated_items).yellow()
    } else {
        style(stats.outdated_items).cyan()
    };
    println!("  Outdated items:  {}", outdated);
    println!(
        "  Database size:   {} KB",
        style(stats.db_size_bytes / 1024).cyan()
    );

    if !stats.by_kind.is_empty() {
        println!();
        println!("  {}", style("By Kind:").bold());
        for (kind, count) in &stats.by_kind {
            println!("    {:<24} {}", kind, count);
        }
    }
    Ok(())
}

fn run_show(id: CacheItemId, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let cache = LcaCache::open(&workspace)?;

    let item = cache
        .item(id)?
        .ok_or_else(|| miette::miette!("cache item {} not found", id))?;
    let children = cache.children(id)?;
    let indicators = cache.indicators(id)?;

    if global.format == OutputFormat::Json {
        let json = serde_json::json!({
            "item": item,
            "children": children,
            "indicators": indicators,
        });
        println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        return Ok(());
    }

    let idents: HashMap<IndicatorId, String> = Dataset::load(&workspace)
        .map(|d| d.indicators.into_iter().map(|i| (i.id, i.ident)).collect())
        .unwrap_or_default();

    println!(
        "{} {} {}",
        style(item.id).cyan(),
        style(item.kind).bold(),
        item.entity_id
    );
    println!("{}", style("─".repeat(40)).dim());
    println!("  Project:       {}", item.project_id);
    println!("  Variant:       {}", item.variant_id);
    if let Some(parent) = item.parent_id {
        println!("  Parent:        {}", parent);
    }
    if let (Some(quantity), Some(unit)) = (item.quantity, item.ref_unit.as_deref()) {
        println!("  Quantity:      {} {}", quantity, unit);
    }
    if let Some(mass) = item.mass {
        println!("  Mass:          {} kg", mass);
    }
    if let Some(n) = item.num_replacements {
        println!("  Replacements:  {}", n);
    }
    if item.is_outdated {
        println!("  Status:        {}", style("outdated").yellow());
    }
    if item.is_virtual {
        println!("  Virtual:       yes (not part of parent totals)");
    }

    if !children.is_empty() {
        println!();
        println!("  {}", style("Children:").bold());
        for child in &children {
            println!("    {:<8} {:<24} {}", child.id, child.kind, child.entity_id);
        }
    }

    if !indicators.is_empty() {
        println!();
        println!("  {}", style("Indicators:").bold());
        for row in &indicators {
            let ident = idents
                .get(&row.indicator_id)
                .cloned()
                .unwrap_or_else(|| row.indicator_id.to_string());
            let process = row
                .process_id
                .map(|p| p.to_string())
                .unwrap_or_default();
            println!(
                "    {:<6} {:<8} {:>14} {}",
                row.life_cycle_ident,
                ident,
                format_value(row.value),
                style(process).dim()
            );
        }
    }
    Ok(())
}

fn run_query(sql: &str, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let cache = LcaCache::open(&workspace)?;

    let columns = cache.query_columns(sql)?;
    let rows = cache.query_raw(sql)?;

    let as_objects = || -> Vec<serde_json::Value> {
        rows.iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, col) in columns.iter().enumerate() {
                    if let Some(val) = row.get(i) {
                        obj.insert(col.clone(), serde_json::Value::String(val.clone()));
                    }
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&as_objects()).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&as_objects()).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("{}", columns.join(","));
            for row in &rows {
                println!(
                    "{}",
                    row.iter().map(|s| escape_csv(s)).collect::<Vec<_>>().join(",")
                );
            }
        }
        _ => {
            println!("{}", columns.join("\t"));
            for row in &rows {
                println!("{}", row.join("\t"));
            }
        }
    }
    Ok(())
}

fn run_clear(global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let cache_path = workspace.root().join(CACHE_FILE);

    if cache_path.exists() {
        std::fs::remove_file(&cache_path)
            .map_err(|e| miette::miette!("Failed to remove cache: {}", e))?;
        for suffix in ["-journal", "-wal", "-shm"] {
            let side_file = workspace.root().join(format!("{}{}", CACHE_FILE, suffix));
            if side_file.exists() {
                std::fs::remove_file(side_file).into_diagnostic()?;
            }
        }
        println!("{} Cache cleared", style("✓").green());
    } else {
        println!("No cache to clear");
    }
    Ok(())
}
