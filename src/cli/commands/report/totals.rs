//! Totals report

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{area_years, format_value};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::{CacheItemKind, ModuleTotal};
use crate::core::identity::{IndicatorId, ProjectId, VariantId};
use crate::entities::{Indicator, LifeCycleModule};

use super::{write_output, ReportContext, ReportTarget};

#[derive(clap::Args, Debug)]
pub struct TotalsArgs {
    #[command(flatten)]
    pub target: ReportTarget,

    /// Divide by net floor area and life time (values per m² and year)
    #[arg(long)]
    pub per_m2a: bool,
}

#[derive(Debug, Serialize)]
struct TotalsReport {
    project: ProjectId,
    variant: VariantId,
    per_m2a: bool,
    /// Module -> indicator ident -> value
    modules: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    /// Indicator ident -> value of the reference model
    reference_model: BTreeMap<String, f64>,
}

/// Position of a module in life cycle order, unknown idents last
fn module_rank(ident: &str) -> usize {
    LifeCycleModule::all()
        .iter()
        .position(|m| m.as_str() == ident)
        .unwrap_or(usize::MAX)
}

fn ident_of(indicators: &[Indicator], id: IndicatorId) -> String {
    indicators
        .iter()
        .find(|i| i.id == id)
        .map(|i| i.ident.clone())
        .unwrap_or_else(|| id.to_string())
}

pub fn run(args: TotalsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = ReportContext::load(global)?;
    let (file, variant) = ctx.target(&args.target)?;

    let divisor = if args.per_m2a {
        area_years(&file.project, variant)?
    } else {
        1.0
    };

    let mut totals: Vec<ModuleTotal> = ctx.cache.variant_totals(variant.id)?;
    totals.sort_by_key(|t| module_rank(&t.life_cycle_ident));

    let reference_model: BTreeMap<String, f64> = ctx
        .cache
        .kind_totals(variant.id, CacheItemKind::FinalEnergyRefModel)?
        .into_iter()
        .map(|(id, value)| (ident_of(&ctx.dataset.indicators, id), value / divisor))
        .collect();

    let mut modules: Vec<String> = Vec::new();
    let mut by_module: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    let mut partial: BTreeMap<String, bool> = BTreeMap::new();
    for total in &totals {
        if !modules.contains(&total.life_cycle_ident) {
            modules.push(total.life_cycle_ident.clone());
        }
        by_module
            .entry(total.life_cycle_ident.clone())
            .or_default()
            .insert(
                ident_of(&ctx.dataset.indicators, total.indicator_id),
                total.value.map(|v| v / divisor),
            );
        *partial.entry(total.life_cycle_ident.clone()).or_default() |= total.is_partial;
    }

    match global.format {
        OutputFormat::Json => {
            let report = TotalsReport {
                project: file.project.id,
                variant: variant.id,
                per_m2a: args.per_m2a,
                modules: by_module,
                reference_model,
            };
            let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
            return write_output(&format!("{}\n", json), args.target.output);
        }
        OutputFormat::Yaml => {
            let report = TotalsReport {
                project: file.project.id,
                variant: variant.id,
                per_m2a: args.per_m2a,
                modules: by_module,
                reference_model,
            };
            let yaml = serde_yml::to_string(&report).into_diagnostic()?;
            return write_output(&yaml, args.target.output);
        }
        _ => {}
    }

    let idents: Vec<&Indicator> = ctx.dataset.indicators.iter().collect();

    let mut output = String::new();
    output.push_str(&format!(
        "# Totals: {} / {} ({})\n\n",
        file.project.name, variant.name, variant.id
    ));
    if args.per_m2a {
        output.push_str(&format!(
            "Values per m² NGF and year ({} m², {} years)\n\n",
            variant.ngf, file.project.life_time
        ));
    }

    if modules.is_empty() {
        output.push_str("*No results cached for this variant.*\n");
        return write_output(&output, args.target.output);
    }

    let mut header = vec!["Module".to_string()];
    header.extend(idents.iter().map(|i| {
        if i.unit.is_empty() {
            i.ident.clone()
        } else {
            format!("{} [{}]", i.ident, i.unit)
        }
    }));

    let mut builder = Builder::default();
    builder.push_record(header.clone());
    for module in &modules {
        let values = by_module.get(module);
        let label = if partial.get(module).copied().unwrap_or(false) {
            format!("{}*", module)
        } else {
            module.clone()
        };
        let mut row = vec![label];
        row.extend(idents.iter().map(|i| {
            format_value(values.and_then(|v| v.get(&i.ident).copied().flatten()))
        }));
        builder.push_record(row);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push('\n');

    if partial.values().any(|p| *p) {
        output.push_str("\n\\* partial: not every component provides this module\n");
    }

    if !reference_model.is_empty() {
        output.push_str("\n## Reference Model (operation)\n\n");
        let mut builder = Builder::default();
        builder.push_record(["Indicator", "Value"]);
        for indicator in &idents {
            if let Some(value) = reference_model.get(&indicator.ident) {
                builder.push_record([indicator.ident.clone(), format_value(Some(*value))]);
            }
        }
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push('\n');
    }

    write_output(&output, args.target.output)
}
