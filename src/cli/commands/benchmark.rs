//! `elca benchmark` command - Rate a variant and manage threshold tables

use clap::Subcommand;
use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{area_years, format_value, open_workspace, select_variant};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::{CacheItemKind, LcaCache};
use crate::core::config::Config;
use crate::core::identity::{BenchmarkVersionId, IndicatorId, ProjectId, VariantId};
use crate::core::loader::{load_projects, Dataset};
use crate::entities::{BenchmarkVersion, Threshold};
use crate::lca::{BenchmarkNormalizer, LcaError};

#[derive(clap::Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct BenchmarkArgs {
    #[command(subcommand)]
    pub command: Option<BenchmarkCommands>,

    #[command(flatten)]
    pub rate: RateArgs,
}

#[derive(clap::Args, Debug)]
pub struct RateArgs {
    /// Project to rate (default: first project)
    #[arg(long)]
    pub project: Option<ProjectId>,

    /// Variant to rate (default: first variant of the project)
    #[arg(long)]
    pub variant: Option<VariantId>,

    /// Benchmark version (default: project setting, then config)
    #[arg(long)]
    pub version: Option<BenchmarkVersionId>,

    /// Also show the values needed per score level
    #[arg(long)]
    pub projection: bool,
}

#[derive(Subcommand, Debug)]
pub enum BenchmarkCommands {
    /// Create a benchmark version from a CSV threshold table
    ImportThresholds(ImportThresholdsArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportThresholdsArgs {
    /// CSV file with the columns indicator, score, value (and optionally kind)
    pub file: PathBuf,

    /// Id of the benchmark version to write
    #[arg(long)]
    pub version: BenchmarkVersionId,

    /// Display name (default: file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Rate against a reference building instead of fixed values
    #[arg(long)]
    pub reference_model: bool,

    /// Overwrite an existing benchmark version file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: BenchmarkArgs, global: &GlobalOpts) -> Result<()> {
    match args.command {
        Some(BenchmarkCommands::ImportThresholds(import)) => run_import(import, global),
        None => run_rate(args.rate, global),
    }
}

#[derive(Debug, Serialize)]
struct IndicatorRating {
    ident: String,
    value: Option<f64>,
    score: Option<f64>,
}

#[derive(Debug, Serialize)]
struct RatingReport {
    project: ProjectId,
    variant: VariantId,
    benchmark_version: BenchmarkVersionId,
    benchmark_name: String,
    indicators: Vec<IndicatorRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projection: Option<BTreeMap<String, Vec<Threshold>>>,
}

fn run_rate(args: RateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;
    let config = Config::load_for(Some(&workspace));
    let dataset = Dataset::load(&workspace)?;
    let files = load_projects(&workspace, config.default_life_time)?;
    let cache = LcaCache::open(&workspace)?;

    let (file, variant) = select_variant(&files, args.project, args.variant)?;
    let project = &file.project;

    let version_id = args
        .version
        .or(project.benchmark_version_id)
        .or(config.benchmark_version)
        .ok_or_else(|| {
            miette::miette!(
                help = "pass --version, set benchmark_version_id on the project or benchmark_version in .elca/config.yaml",
                "no benchmark version selected"
            )
        })?;
    let version = dataset
        .benchmark_version(version_id)
        .cloned()
        .ok_or_else(|| {
            LcaError::configuration(format!("unknown benchmark version {}", version_id))
        })?;

    if cache.variant_root(variant.id)?.is_none() {
        miette::bail!(
            "variant {} has not been computed yet, run `elca compute` first",
            variant.id
        );
    }

    let divisor = area_years(project, variant)?;
    let ident_of: HashMap<IndicatorId, &str> = dataset
        .indicators
        .iter()
        .map(|i| (i.id, i.ident.as_str()))
        .collect();

    let totals: BTreeMap<String, f64> = cache
        .variant_totals(variant.id)?
        .into_iter()
        .filter(|t| t.life_cycle_ident == "total")
        .filter_map(|t| {
            let ident = ident_of.get(&t.indicator_id)?;
            Some((ident.to_string(), t.value? / divisor))
        })
        .collect();
    let reference_operation: BTreeMap<String, f64> = cache
        .kind_totals(variant.id, CacheItemKind::FinalEnergyRefModel)?
        .into_iter()
        .filter_map(|(id, value)| Some((ident_of.get(&id)?.to_string(), value / divisor)))
        .collect();

    tracing::debug!(
        variant = %variant.id,
        version = %version_id,
        indicators = totals.len(),
        "rating variant"
    );

    let mut normalizer = BenchmarkNormalizer::new(version);
    let scores = normalizer.compute(&totals, &reference_operation);
    let projection = args
        .projection
        .then(|| normalizer.compute_projection(&reference_operation));

    let indicators: Vec<IndicatorRating> = dataset
        .indicators
        .iter()
        .filter(|i| totals.contains_key(&i.ident) || scores.contains_key(&i.ident))
        .map(|i| IndicatorRating {
            ident: i.ident.clone(),
            value: totals.get(&i.ident).copied(),
            score: scores.get(&i.ident).copied(),
        })
        .collect();

    let report = RatingReport {
        project: project.id,
        variant: variant.id,
        benchmark_version: version_id,
        benchmark_name: normalizer.version().name.clone(),
        indicators,
        projection,
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&report).into_diagnostic()?);
            return Ok(());
        }
        _ => {}
    }

    let mut output = String::new();
    output.push_str(&format!(
        "# Benchmark: {} / {} ({}) against {} ({})\n\n",
        project.name, variant.name, variant.id, report.benchmark_name, version_id
    ));
    output.push_str("Values per m² NGF and year\n\n");

    let mut builder = Builder::default();
    builder.push_record(["Indicator", "Value", "Score"]);
    for rating in &report.indicators {
        builder.push_record([
            rating.ident.clone(),
            format_value(rating.value),
            rating
                .score
                .map(|s| format!("{:.1}", s))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push('\n');

    if let Some(projection) = &report.projection {
        output.push_str("\n## Projection\n\n");
        let mut builder = Builder::default();
        builder.push_record(["Indicator", "Score", "Value to reach"]);
        for (ident, levels) in projection {
            for level in levels {
                builder.push_record([
                    ident.clone(),
                    format!("{:.1}", level.score),
                    format_value(Some(level.value)),
                ]);
            }
        }
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push('\n');
    }

    print!("{}", output);
    Ok(())
}

/// Threshold rows and reference construction values read from CSV
#[derive(Debug, Default)]
struct ThresholdTable {
    thresholds: BTreeMap<String, Vec<Threshold>>,
    ref_construction: BTreeMap<String, f64>,
}

fn build_header_map(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase().trim().to_string(), i))
        .collect()
}

fn get_field<'r>(
    record: &'r csv::StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> Option<&'r str> {
    header_map
        .get(field)
        .and_then(|&i| record.get(i))
        .filter(|s| !s.is_empty())
}

fn parse_number(value: Option<&str>, field: &str, row_num: usize) -> Result<f64> {
    let value = value.ok_or_else(|| miette::miette!("row {}: missing {}", row_num, field))?;
    value
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| miette::miette!("row {}: invalid {} '{}'", row_num, field, value))
}

/// Parse `indicator,score,value[,kind]` rows
///
/// Rows of kind `ref_construction` give the reference construction value of
/// an indicator; their score column is ignored.
fn read_thresholds(reader: impl Read) -> Result<ThresholdTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);
    for required in ["indicator", "value"] {
        if !header_map.contains_key(required) {
            miette::bail!("missing column '{}'", required);
        }
    }

    let mut table = ThresholdTable::default();
    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2;
        let record = result.into_diagnostic()?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let ident = get_field(&record, &header_map, "indicator")
            .ok_or_else(|| miette::miette!("row {}: missing indicator", row_num))?
            .to_lowercase();
        let value = parse_number(get_field(&record, &header_map, "value"), "value", row_num)?;

        match get_field(&record, &header_map, "kind").unwrap_or("threshold") {
            "threshold" => {
                let score =
                    parse_number(get_field(&record, &header_map, "score"), "score", row_num)?;
                table
                    .thresholds
                    .entry(ident)
                    .or_default()
                    .push(Threshold { score, value });
            }
            "ref_construction" => {
                table.ref_construction.insert(ident, value);
            }
            other => miette::bail!("row {}: unknown kind '{}'", row_num, other),
        }
    }
    Ok(table)
}

fn run_import(args: ImportThresholdsArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = open_workspace(global)?;

    let file = File::open(&args.file).into_diagnostic()?;
    let table = read_thresholds(BufReader::new(file))?;
    if table.thresholds.is_empty() {
        miette::bail!("{} contains no threshold rows", args.file.display());
    }

    let name = args.name.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.version.to_string())
    });
    let version = BenchmarkVersion {
        id: args.version,
        name,
        use_reference_model: args.reference_model,
        thresholds: table.thresholds,
        ref_construction: table.ref_construction,
    };

    let dir = workspace.reference_dir("benchmarks");
    std::fs::create_dir_all(&dir).into_diagnostic()?;
    let path = dir.join(format!("{}.yaml", args.version.0));
    if path.exists() && !args.force {
        miette::bail!(
            "{} already exists, use --force to overwrite",
            workspace.relative_path(&path)
        );
    }

    let yaml = serde_yml::to_string(&version).into_diagnostic()?;
    std::fs::write(&path, yaml).into_diagnostic()?;

    let rows: usize = version.thresholds.values().map(Vec::len).sum();
    println!(
        "{} Imported {} threshold(s) for {} indicator(s) into {}",
        style("✓").green(),
        rows,
        version.thresholds.len(),
        style(workspace.relative_path(&path)).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_thresholds() {
        let csv = "Indicator,Score,Value,Kind\n\
                   gwp,10,40,\n\
                   GWP,100,\"12,5\",\n\
                   pert,10,5,threshold\n\
                   gwp,,9.4,ref_construction\n\
                   ,,,\n";
        let table = read_thresholds(csv.as_bytes()).unwrap();
        assert_eq!(table.thresholds["gwp"].len(), 2);
        assert_eq!(table.thresholds["gwp"][1], Threshold { score: 100.0, value: 12.5 });
        assert_eq!(table.thresholds["pert"].len(), 1);
        assert_eq!(table.ref_construction["gwp"], 9.4);
    }

    #[test]
    fn test_read_thresholds_without_kind_column() {
        let csv = "indicator,score,value\npenrt,50,300\n";
        let table = read_thresholds(csv.as_bytes()).unwrap();
        assert_eq!(table.thresholds["penrt"][0].score, 50.0);
        assert!(table.ref_construction.is_empty());
    }

    #[test]
    fn test_read_thresholds_reports_row() {
        let err = read_thresholds("indicator,score,value\ngwp,ten,40\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"));

        let err = read_thresholds("indicator,score\ngwp,10\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("value"));

        let err = read_thresholds("indicator,score,value,kind\ngwp,10,1,other\n".as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("unknown kind"));
    }
}
