//! Loading reference data and project files from a workspace
//!
//! Layout below the workspace root:
//!
//! ```text
//! reference/indicators/*.yaml       list of indicators
//! reference/process_dbs/*.yaml      list of process databases
//! reference/element_types/*.yaml    list of element type nodes
//! reference/process_configs/*.yaml  one process configuration per file
//! reference/benchmarks/*.yaml       one benchmark version per file
//! projects/*.yaml                   one project with its variants per file
//! ```

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::core::cache::compute_hash;
use crate::core::identity::{
    BenchmarkVersionId, ElementTypeNodeId, ProcessConfigId, ProcessDbId, ProjectId,
};
use crate::core::project::Project;
use crate::entities::{
    BenchmarkVersion, ElementType, Indicator, ProcessConfig, ProcessDb,
    Project as BuildingProject,
};
use crate::lca::repository::{ElementTypeRepository, ProcessRepository};
use crate::yaml::{parse_file, parse_str, YamlError};

/// All reference data of a workspace
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub indicators: Vec<Indicator>,
    pub process_dbs: Vec<ProcessDb>,
    pub process_configs: Vec<ProcessConfig>,
    pub element_types: Vec<ElementType>,
    pub benchmark_versions: Vec<BenchmarkVersion>,
    /// SHA-256 over every file that feeds computation (benchmarks excluded)
    pub digest: String,
}

/// Read a reference file, feeding its path and content into `hasher`
fn read_reference(
    workspace: &Project,
    path: &Path,
    hasher: &mut Sha256,
) -> Result<String, YamlError> {
    let content = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    hasher.update(workspace.relative_path(path).as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hasher.update([0u8]);
    Ok(content)
}

impl Dataset {
    /// Read every reference file of the workspace
    pub fn load(project: &Project) -> Result<Self, YamlError> {
        let mut dataset = Dataset::default();
        let mut hasher = Sha256::new();

        for path in Project::iter_yaml_files(&project.reference_dir("indicators")) {
            let content = read_reference(project, &path, &mut hasher)?;
            let indicators: Vec<Indicator> = parse_str(&content, &path.display().to_string())?;
            dataset.indicators.extend(indicators);
        }
        for path in Project::iter_yaml_files(&project.reference_dir("process_dbs")) {
            let content = read_reference(project, &path, &mut hasher)?;
            let dbs: Vec<ProcessDb> = parse_str(&content, &path.display().to_string())?;
            dataset.process_dbs.extend(dbs);
        }
        for path in Project::iter_yaml_files(&project.reference_dir("element_types")) {
            let content = read_reference(project, &path, &mut hasher)?;
            let types: Vec<ElementType> = parse_str(&content, &path.display().to_string())?;
            dataset.element_types.extend(types);
        }
        for path in Project::iter_yaml_files(&project.reference_dir("process_configs")) {
            let content = read_reference(project, &path, &mut hasher)?;
            dataset
                .process_configs
                .push(parse_str(&content, &path.display().to_string())?);
        }
        for path in Project::iter_yaml_files(&project.reference_dir("benchmarks")) {
            dataset.benchmark_versions.push(parse_file(&path)?);
        }

        dataset.digest = format!("{:x}", hasher.finalize());
        dataset.indicators.sort_by_key(|i| (i.position, i.id));
        tracing::debug!(
            indicators = dataset.indicators.len(),
            process_configs = dataset.process_configs.len(),
            element_types = dataset.element_types.len(),
            benchmarks = dataset.benchmark_versions.len(),
            "reference data loaded"
        );
        Ok(dataset)
    }

    pub fn benchmark_version(&self, id: BenchmarkVersionId) -> Option<&BenchmarkVersion> {
        self.benchmark_versions.iter().find(|v| v.id == id)
    }

    pub fn indicator_by_ident(&self, ident: &str) -> Option<&Indicator> {
        self.indicators
            .iter()
            .find(|i| i.ident.eq_ignore_ascii_case(ident))
    }
}

impl ProcessRepository for Dataset {
    fn process_db(&self, id: ProcessDbId) -> Option<&ProcessDb> {
        self.process_dbs.iter().find(|db| db.id == id)
    }

    fn process_config(&self, id: ProcessConfigId) -> Option<&ProcessConfig> {
        self.process_configs.iter().find(|c| c.id == id)
    }

    /// Indicators are shared by all process databases
    fn indicators(&self, _process_db_id: ProcessDbId) -> Vec<Indicator> {
        self.indicators.clone()
    }
}

impl ElementTypeRepository for Dataset {
    fn element_type(&self, node_id: ElementTypeNodeId) -> Option<&ElementType> {
        self.element_types.iter().find(|t| t.node_id == node_id)
    }
}

/// A project file together with its content digest
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub path: PathBuf,
    /// Path relative to the workspace root
    pub key: String,
    pub digest: String,
    pub project: BuildingProject,
}

impl ProjectFile {
    /// Digest of everything a computation of this project reads
    ///
    /// Combines the file digest, the reference data digest and the effective
    /// life time, so editing a process config or the configured default life
    /// time invalidates the project as well.
    pub fn input_digest(&self, reference_digest: &str) -> String {
        compute_hash(&format!(
            "{}\n{}\nlife_time={}",
            self.digest, reference_digest, self.project.life_time
        ))
    }
}

/// Read every project file of the workspace
///
/// Projects without their own `life_time` get `default_life_time` when one
/// is configured.
pub fn load_projects(
    workspace: &Project,
    default_life_time: Option<u32>,
) -> Result<Vec<ProjectFile>, YamlError> {
    let mut files = Vec::new();

    for path in Project::iter_yaml_files(&workspace.projects_dir()) {
        let content = std::fs::read_to_string(&path).map_err(|source| YamlError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let filename = workspace.relative_path(&path);
        let mut project: BuildingProject = parse_str(&content, &filename)?;

        if let Some(years) = default_life_time {
            let raw: serde_yml::Value = parse_str(&content, &filename)?;
            if raw.get("life_time").is_none() {
                project.life_time = years;
            }
        }

        files.push(ProjectFile {
            digest: compute_hash(&content),
            key: filename,
            path,
            project,
        });
    }

    let mut seen: Vec<ProjectId> = Vec::new();
    for file in &files {
        if seen.contains(&file.project.id) {
            tracing::warn!(project = %file.project.id, file = %file.key, "duplicate project id");
        }
        seen.push(file.project.id);
    }

    Ok(files)
}
