//! Component breakdown report

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::HashMap;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_value, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{CacheItemId, ComponentId, ElementId};
use crate::entities::{Element, ElementComponent, ProjectVariant};
use crate::lca::ProcessRepository;

use super::{write_output, ReportContext, ReportTarget};

#[derive(clap::Args, Debug)]
pub struct ComponentsArgs {
    #[command(flatten)]
    pub target: ReportTarget,

    /// Indicator ident to rank by (default: first indicator)
    #[arg(long, short = 'i')]
    pub indicator: Option<String>,

    /// Show only the first N components
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ComponentRow {
    item: CacheItemId,
    component: ComponentId,
    element: Option<ElementId>,
    element_name: String,
    material: String,
    mass: Option<f64>,
    replacements: Option<u32>,
    value: Option<f64>,
}

/// Every element of a variant including sub-elements, with their components
fn index_elements(
    variant: &ProjectVariant,
) -> (
    HashMap<ElementId, &Element>,
    HashMap<ComponentId, &ElementComponent>,
) {
    let mut elements = HashMap::new();
    let mut components = HashMap::new();
    let mut stack: Vec<&Element> = variant.elements.iter().collect();
    while let Some(element) = stack.pop() {
        elements.insert(element.id, element);
        for component in &element.components {
            components.insert(component.id, component);
        }
        stack.extend(element.sub_elements.iter());
    }
    (elements, components)
}

pub fn run(args: ComponentsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = ReportContext::load(global)?;
    let (_file, variant) = ctx.target(&args.target)?;

    let indicator = match &args.indicator {
        Some(ident) => ctx
            .dataset
            .indicator_by_ident(ident)
            .ok_or_else(|| miette::miette!("unknown indicator '{}'", ident))?,
        None => ctx
            .dataset
            .indicators
            .first()
            .ok_or_else(|| miette::miette!("no indicators in reference/indicators"))?,
    };

    let (elements, components) = index_elements(variant);

    let mut rows: Vec<ComponentRow> = ctx
        .cache
        .component_totals(variant.id, indicator.id)?
        .into_iter()
        .map(|total| {
            let component_id = ComponentId(total.component_id as u32);
            let element_id = total.element_id.map(|id| ElementId(id as u32));
            let material = components
                .get(&component_id)
                .and_then(|c| ctx.dataset.process_config(c.process_config_id))
                .map(|config| config.name.clone())
                .unwrap_or_default();
            let element_name = element_id
                .and_then(|id| elements.get(&id))
                .map(|e| e.name.clone())
                .unwrap_or_default();
            ComponentRow {
                item: total.item_id,
                component: component_id,
                element: element_id,
                element_name,
                material,
                mass: total.mass,
                replacements: total.num_replacements,
                value: total.value,
            }
        })
        .collect();

    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if global.format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&rows).into_diagnostic()?;
        return write_output(&format!("{}\n", json), args.target.output);
    }

    let mut output = String::new();
    output.push_str(&format!(
        "# Components: {} ({}) by {}\n\n",
        variant.name, variant.id, indicator.ident
    ));

    if rows.is_empty() {
        output.push_str("*No components cached for this variant.*\n");
        return write_output(&output, args.target.output);
    }

    let value_header = if indicator.unit.is_empty() {
        indicator.ident.clone()
    } else {
        format!("{} [{}]", indicator.ident, indicator.unit)
    };

    let mut builder = Builder::default();
    builder.push_record([
        "Component".to_string(),
        "Element".to_string(),
        "Material".to_string(),
        "Mass [kg]".to_string(),
        "Repl.".to_string(),
        value_header,
    ]);
    for row in &rows {
        builder.push_record([
            row.component.to_string(),
            match row.element {
                Some(id) if row.element_name.is_empty() => id.to_string(),
                Some(id) => format!("{} {}", id, truncate_str(&row.element_name, 24)),
                None => "-".to_string(),
            },
            truncate_str(&row.material, 30),
            format_value(row.mass),
            row.replacements.map(|n| n.to_string()).unwrap_or_default(),
            format_value(row.value),
        ]);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push('\n');

    write_output(&output, args.target.output)
}
