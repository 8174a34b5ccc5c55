//! `elca compute` command - Recompute projects into the result cache

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::time::Instant;

use crate::cli::helpers::open_workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::LcaCache;
use crate::core::config::Config;
use crate::core::identity::{ProjectId, VariantId};
use crate::core::loader::{load_projects, Dataset};
use crate::lca::{LcaProcessor, TracingObserver};

#[derive(clap::Args, Debug)]
pub struct ComputeArgs {
    /// Only compute this project (PRJ-1 or 1)
    #[arg(long)]
    pub project: Option<ProjectId>,

    /// Only compute this variant (VAR-10 or 10)
    #[arg(long)]
    pub variant: Option<VariantId>,

    /// Recompute even if neither the project file nor the reference data changed
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ComputeSummary {
    project: ProjectId,
    name: String,
    file: String,
    status: &'static str,
    variants: Vec<VariantId>,
    items_recomputed: usize,
    duration_ms: u64,
}

pub fn run(args: ComputeArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let config = Config::load_for(Some(&workspace));
    let dataset = Dataset::load(&workspace)?;
    let files = load_projects(&workspace, config.default_life_time)?;
    let cache = LcaCache::open(&workspace)?;
    let reference_digest = dataset.digest.clone();

    let mut processor = LcaProcessor::new(dataset, cache);
    processor.register_observer(Box::new(TracingObserver::new()));

    if args.project.is_none() && args.variant.is_none() {
        let projects: Vec<ProjectId> = files.iter().map(|f| f.project.id).collect();
        let keys: Vec<&str> = files.iter().map(|f| f.key.as_str()).collect();
        let removed = processor.cache_mut().prune(&projects, &keys)?;
        if removed > 0 {
            tracing::info!(removed, "removed projects without a project file");
        }
    }

    let selected: Vec<_> = files
        .iter()
        .filter(|f| args.project.map_or(true, |id| f.project.id == id))
        .filter(|f| {
            args.variant
                .map_or(true, |id| f.project.variant(id).is_some())
        })
        .collect();

    if selected.is_empty() {
        match (args.project, args.variant) {
            (Some(id), _) => miette::bail!("project {} not found", id),
            (None, Some(id)) => miette::bail!("variant {} not found", id),
            (None, None) => {
                println!(
                    "{} No projects found in {}",
                    style("!").yellow(),
                    style(workspace.projects_dir().display()).cyan()
                );
                return Ok(());
            }
        }
    }

    let mut summaries = Vec::new();
    for file in selected {
        let project = &file.project;
        let start = Instant::now();

        let digest = file.input_digest(&reference_digest);
        let unchanged =
            processor.cache().file_digest(&file.key)?.as_deref() == Some(digest.as_str());
        if unchanged && !args.force && args.variant.is_none() {
            tracing::debug!(project = %project.id, file = %file.key, "unchanged, skipping");
            summaries.push(ComputeSummary {
                project: project.id,
                name: project.name.clone(),
                file: file.key.clone(),
                status: "unchanged",
                variants: Vec::new(),
                items_recomputed: 0,
                duration_ms: 0,
            });
            continue;
        }

        let (variants, stats) = match args.variant {
            Some(variant_id) => {
                let variant = project
                    .variant(variant_id)
                    .ok_or_else(|| miette::miette!("variant {} not found", variant_id))?;
                processor.compute_project_variant(project, variant)?;
                let stats = processor.update_cache(project.id, Some(variant_id))?;
                (vec![variant_id], stats)
            }
            None => {
                let stats = processor.compute_project(project)?;
                processor
                    .cache()
                    .set_file_digest(&file.key, &digest)?;
                (project.variants.iter().map(|v| v.id).collect(), stats)
            }
        };

        summaries.push(ComputeSummary {
            project: project.id,
            name: project.name.clone(),
            file: file.key.clone(),
            status: "computed",
            variants,
            items_recomputed: stats.items_recomputed,
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summaries).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&summaries).into_diagnostic()?;
            print!("{}", yaml);
        }
        _ => {
            for summary in &summaries {
                if summary.status == "unchanged" {
                    println!(
                        "{} {} {} unchanged (use --force to recompute)",
                        style("→").blue(),
                        style(summary.project).cyan(),
                        summary.name
                    );
                } else {
                    println!(
                        "{} Computed {} {} ({} variant(s), {} items aggregated) in {}ms",
                        style("✓").green(),
                        style(summary.project).cyan(),
                        summary.name,
                        summary.variants.len(),
                        summary.items_recomputed,
                        summary.duration_ms
                    );
                }
            }
        }
    }

    Ok(())
}
