//! `elca report` command - Result tables of a computed variant

mod components;
mod totals;

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::helpers::{open_workspace, select_variant};
use crate::cli::GlobalOpts;
use crate::core::cache::LcaCache;
use crate::core::config::Config;
use crate::core::identity::{ProjectId, VariantId};
use crate::core::loader::{load_projects, Dataset, ProjectFile};
use crate::entities::ProjectVariant;

pub use components::ComponentsArgs;
pub use totals::TotalsArgs;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Totals per life cycle module and indicator
    Totals(TotalsArgs),

    /// Per-component breakdown of one indicator, largest first
    #[clap(alias = "cmp")]
    Components(ComponentsArgs),
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Totals(args) => totals::run(args, global),
        ReportCommands::Components(args) => components::run(args, global),
    }
}

/// Options shared by every report
#[derive(clap::Args, Debug)]
pub struct ReportTarget {
    /// Project to report on (default: first project)
    #[arg(long)]
    pub project: Option<ProjectId>,

    /// Variant to report on (default: first variant of the project)
    #[arg(long)]
    pub variant: Option<VariantId>,

    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Everything a report reads
pub(crate) struct ReportContext {
    pub dataset: Dataset,
    pub files: Vec<ProjectFile>,
    pub cache: LcaCache,
}

impl ReportContext {
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let workspace = open_workspace(global)?;
        let config = Config::load_for(Some(&workspace));
        Ok(Self {
            dataset: Dataset::load(&workspace)?,
            files: load_projects(&workspace, config.default_life_time)?,
            cache: LcaCache::open(&workspace)?,
        })
    }

    /// Resolve the target and make sure it has been computed
    pub fn target(&self, target: &ReportTarget) -> Result<(&ProjectFile, &ProjectVariant)> {
        let (file, variant) = select_variant(&self.files, target.project, target.variant)?;
        if self.cache.variant_root(variant.id)?.is_none() {
            miette::bail!(
                "variant {} has not been computed yet, run `elca compute` first",
                variant.id
            );
        }
        let outdated = self.cache.outdated_count(variant.id)?;
        if outdated > 0 {
            tracing::warn!(variant = %variant.id, outdated, "cache has outdated items, run `elca cache update`");
        }
        Ok((file, variant))
    }
}

pub(crate) fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
