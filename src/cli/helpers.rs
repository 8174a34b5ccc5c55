//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::identity::{ProjectId, VariantId};
use crate::core::project::Project;
use crate::core::ProjectFile;
use crate::entities::{Project as BuildingProject, ProjectVariant};

/// Workspace from `--root` or the current directory
pub fn open_workspace(global: &GlobalOpts) -> Result<Project> {
    let found = match &global.root {
        Some(root) => Project::discover_from(root),
        None => Project::discover(),
    };
    found.map_err(|e| miette::miette!("{}", e))
}

/// Pick a project and variant, defaulting to the first of each
pub fn select_variant<'a>(
    files: &'a [ProjectFile],
    project_id: Option<ProjectId>,
    variant_id: Option<VariantId>,
) -> Result<(&'a ProjectFile, &'a ProjectVariant)> {
    let file = match project_id {
        Some(id) => files
            .iter()
            .find(|f| f.project.id == id)
            .ok_or_else(|| miette::miette!("project {} not found", id))?,
        None => match variant_id {
            Some(v) => files
                .iter()
                .find(|f| f.project.variant(v).is_some())
                .ok_or_else(|| miette::miette!("variant {} not found", v))?,
            None => files
                .first()
                .ok_or_else(|| miette::miette!("no projects in workspace"))?,
        },
    };

    let variant = match variant_id {
        Some(id) => file.project.variant(id).ok_or_else(|| {
            miette::miette!("variant {} not found in project {}", id, file.project.id)
        })?,
        None => file
            .project
            .variants
            .first()
            .ok_or_else(|| miette::miette!("project {} has no variants", file.project.id))?,
    };
    Ok((file, variant))
}

/// Format an optional indicator value for table cells
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v != 0.0 && v.abs() < 0.001 => format!("{:.3e}", v),
        Some(v) => format!("{:.3}", v),
        None => "-".to_string(),
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Net floor area times life time, the divisor for values per m² and year
pub fn area_years(project: &BuildingProject, variant: &ProjectVariant) -> Result<f64> {
    let divisor = variant.ngf * project.life_time as f64;
    if divisor <= 0.0 {
        miette::bail!(
            "variant {} needs a net floor area and project {} a life time",
            variant.id,
            project.id
        );
    }
    Ok(divisor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(id: u32, variants: &[u32]) -> ProjectFile {
        let yaml = format!(
            "id: {}\nname: P\nprocess_db_id: 1\nvariants: [{}]\n",
            id,
            variants
                .iter()
                .map(|v| format!("{{ id: {} }}", v))
                .collect::<Vec<_>>()
                .join(", ")
        );
        ProjectFile {
            path: PathBuf::from("p.yaml"),
            key: "projects/p.yaml".to_string(),
            digest: String::new(),
            project: serde_yml::from_str::<BuildingProject>(&yaml).unwrap(),
        }
    }

    #[test]
    fn test_select_variant_defaults_to_first() {
        let files = vec![file(1, &[10, 11]), file(2, &[20])];
        let (f, v) = select_variant(&files, None, None).unwrap();
        assert_eq!(f.project.id, ProjectId(1));
        assert_eq!(v.id, VariantId(10));
    }

    #[test]
    fn test_select_variant_finds_project_of_variant() {
        let files = vec![file(1, &[10]), file(2, &[20])];
        let (f, v) = select_variant(&files, None, Some(VariantId(20))).unwrap();
        assert_eq!(f.project.id, ProjectId(2));
        assert_eq!(v.id, VariantId(20));
        assert!(select_variant(&files, Some(ProjectId(1)), Some(VariantId(20))).is_err());
        assert!(select_variant(&[], None, None).is_err());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(18.12)), "18.120");
        assert_eq!(format_value(Some(0.0)), "0.000");
        assert_eq!(format_value(Some(0.00012)), "1.200e-4");
    }

    #[test]
    fn test_area_years() {
        let files = vec![file(1, &[10])];
        let (f, v) = select_variant(&files, None, None).unwrap();
        // ngf defaults to 0
        assert!(area_years(&f.project, v).is_err());

        let mut variant = v.clone();
        variant.ngf = 100.0;
        let mut project = f.project.clone();
        project.life_time = 50;
        assert_eq!(area_years(&project, &variant).unwrap(), 5000.0);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("Außenwand", 6), "Auß...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }
}
