//! `elca init` command - Initialize a new eLCA workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Write a small sample dataset and project
    #[arg(long)]
    pub sample: bool,

    /// Force initialization even if .elca/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized eLCA workspace at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );

            if args.sample {
                write_sample(&project)?;
                println!("{} Wrote sample dataset", style("✓").green());
            }

            println!();
            println!("Created workspace structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Add reference data below reference/ and projects below projects/",
                style("→").blue()
            );
            println!(
                "  {} Compute all projects",
                style("elca compute").yellow()
            );
            println!(
                "  {} Show the result totals",
                style("elca report totals").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} eLCA workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("elca init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        ".elca/",
        ".elca/config.yaml",
        "reference/indicators/",
        "reference/process_dbs/",
        "reference/process_configs/",
        "reference/element_types/",
        "reference/benchmarks/",
        "projects/",
    ];

    for entry in entries {
        let full_path = root.join(entry);
        if full_path.exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}

fn write_sample(project: &Project) -> Result<()> {
    let files = [
        ("reference/indicators/en15804.yaml", SAMPLE_INDICATORS),
        ("reference/process_dbs/sample.yaml", SAMPLE_PROCESS_DBS),
        ("reference/element_types/din276.yaml", SAMPLE_ELEMENT_TYPES),
        ("reference/process_configs/concrete.yaml", SAMPLE_CONCRETE),
        ("reference/process_configs/mineral_wool.yaml", SAMPLE_MINERAL_WOOL),
        ("reference/process_configs/grid_electricity.yaml", SAMPLE_ELECTRICITY),
        ("reference/process_configs/photovoltaics.yaml", SAMPLE_PHOTOVOLTAICS),
        ("reference/process_configs/truck.yaml", SAMPLE_TRUCK),
        ("reference/benchmarks/sample.yaml", SAMPLE_BENCHMARK),
        ("projects/office.yaml", SAMPLE_PROJECT),
    ];

    for (rel_path, content) in files {
        let path = project.root().join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
        std::fs::write(&path, content).into_diagnostic()?;
    }
    Ok(())
}

const SAMPLE_INDICATORS: &str = r#"- { id: 1, ident: gwp, name: Global warming potential, unit: kg CO2 eq, position: 1 }
- { id: 2, ident: penrt, name: Non-renewable primary energy, unit: MJ, position: 2 }
- { id: 3, ident: pert, name: Renewable primary energy, unit: MJ, position: 3 }
- { id: 4, ident: pet, name: Total primary energy, unit: MJ, position: 4 }
"#;

const SAMPLE_PROCESS_DBS: &str = r#"- { id: 1, name: Sample database 2024, en15804: true }
"#;

const SAMPLE_ELEMENT_TYPES: &str = r#"- { node_id: 300, din_code: "300", name: Building construction }
- { node_id: 330, parent_node_id: 300, din_code: "330", name: External walls }
- { node_id: 350, parent_node_id: 300, din_code: "350", name: Ceilings }
"#;

const SAMPLE_CONCRETE: &str = r#"id: 1
name: Ready-mix concrete C30/37
default_life_time: 50
conversions:
  - { in_unit: m3, out_unit: kg, factor: 2400 }
life_cycles:
  - process_db_id: 1
    processes:
      - { id: 1, module: A1-3, reference: { value: 1, unit: m3 }, indicators: { gwp: 250, penrt: 1500, pert: 100 } }
      - { id: 2, module: C3, reference: { value: 1, unit: m3 }, indicators: { gwp: 10, penrt: 50, pert: 2 } }
      - { id: 3, module: D, reference: { value: 1, unit: m3 }, indicators: { gwp: -20, penrt: -150, pert: -5 } }
"#;

const SAMPLE_MINERAL_WOOL: &str = r#"id: 2
name: Mineral wool insulation
conversions:
  - { in_unit: m3, out_unit: kg, factor: 30 }
life_cycles:
  - process_db_id: 1
    processes:
      - { id: 4, module: A1-3, reference: { value: 1, unit: m3 }, indicators: { gwp: 60, penrt: 900, pert: 50 } }
      - { id: 5, module: C4, reference: { value: 1, unit: kg }, indicators: { gwp: 0.02, penrt: 0.3, pert: 0.01 } }
"#;

const SAMPLE_ELECTRICITY: &str = r#"id: 3
name: Grid electricity
life_cycles:
  - process_db_id: 1
    processes:
      - { id: 6, module: B6, reference: { value: 1, unit: kWh }, indicators: { gwp: 0.5, penrt: 8, pert: 2 } }
"#;

const SAMPLE_PHOTOVOLTAICS: &str = r#"id: 4
name: Photovoltaic yield
attributes:
  invert_values: true
life_cycles:
  - process_db_id: 1
    processes:
      - { id: 7, module: B6, reference: { value: 1, unit: kWh }, indicators: { gwp: 0.5, penrt: 8, pert: 2 } }
"#;

const SAMPLE_TRUCK: &str = r#"id: 5
name: Truck, 40 t
life_cycles:
  - process_db_id: 1
    processes:
      - { id: 8, module: A4, reference: { value: 1, unit: tkm }, indicators: { gwp: 0.1, penrt: 1.5, pert: 0.01 } }
"#;

const SAMPLE_BENCHMARK: &str = r#"id: 1
name: Sample rating
thresholds:
  gwp:
    - { score: 10, value: 40 }
    - { score: 50, value: 25 }
    - { score: 100, value: 12 }
  penrt:
    - { score: 10, value: 400 }
    - { score: 100, value: 150 }
  pert:
    - { score: 10, value: 5 }
    - { score: 100, value: 30 }
"#;

const SAMPLE_PROJECT: &str = r#"id: 1
name: Sample office
life_time: 50
process_db_id: 1
benchmark_version_id: 1
variants:
  - id: 10
    name: Design
    ngf: 1000
    elements:
      - id: 1
        name: External wall
        element_type_node_id: 330
        quantity: 400
        ref_unit: m2
        components:
          - { id: 1, process_config_id: 1, quantity: { value: 0.2, unit: m3 }, life_time: 50 }
          - { id: 2, process_config_id: 2, quantity: { value: 0.16, unit: m3 }, life_time: 40 }
      - id: 2
        name: Ceiling slab
        element_type_node_id: 350
        quantity: 1
        ref_unit: piece
        is_composite: true
        sub_elements:
          - id: 3
            name: Slab concrete
            element_type_node_id: 350
            quantity: 1000
            ref_unit: m2
            components:
              - { id: 3, process_config_id: 1, quantity: { value: 0.25, unit: m3 }, life_time: 50 }
    final_energy_demands:
      - { id: 1, process_config_id: 3, heating: 30, water: 10 }
    final_energy_supplies:
      - { id: 1, process_config_id: 4, quantity: 5000, description: Rooftop PV }
    final_energy_ref_models:
      - { id: 1, process_config_id: 3, heating: 45, water: 10 }
    transports:
      - id: 1
        name: Concrete delivery
        quantity: 792
        means:
          - { id: 1, process_config_id: 5, distance: 30 }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{load_projects, Dataset};
    use tempfile::tempdir;

    #[test]
    fn test_sample_dataset_loads() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        write_sample(&project).unwrap();

        let dataset = Dataset::load(&project).unwrap();
        assert_eq!(dataset.indicators.len(), 4);
        assert_eq!(dataset.process_configs.len(), 5);
        assert_eq!(dataset.benchmark_versions.len(), 1);

        let files = load_projects(&project, None).unwrap();
        assert_eq!(files.len(), 1);
        let variant = &files[0].project.variants[0];
        assert_eq!(variant.elements.len(), 2);
        assert_eq!(variant.elements[1].sub_elements.len(), 1);
        assert_eq!(variant.transports[0].means.len(), 1);
    }
}
