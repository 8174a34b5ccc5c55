//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reference data subdirectories below `reference/`
pub const REFERENCE_DIRS: [&str; 5] = [
    "indicators",
    "process_dbs",
    "process_configs",
    "element_types",
    "benchmarks",
];

/// Represents an eLCA workspace
#[derive(Debug)]
pub struct Project {
    /// Root directory of the workspace (parent of .elca/)
    root: PathBuf,
}

impl Project {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".elca").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(".elca").exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::create_layout(root)
    }

    /// Initialize even if .elca/ exists; existing data files are kept
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        Self::create_layout(root)
    }

    fn create_layout(root: PathBuf) -> Result<Self, ProjectError> {
        let elca_dir = root.join(".elca");
        std::fs::create_dir_all(&elca_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(elca_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(elca_dir.join(".gitignore"), "cache.db*\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for dir in REFERENCE_DIRS {
            std::fs::create_dir_all(root.join("reference").join(dir))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }
        std::fs::create_dir_all(root.join("projects"))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# eLCA workspace configuration

# Log level when neither --verbose nor --quiet is given (error, warn, info, debug, trace)
# log_level: warn

# Observation period for projects that do not set life_time
# default_life_time: 50

# Benchmark version used by `elca benchmark` when --version is omitted
# benchmark_version: 1

# Default output format (auto, json, yaml, md)
# default_format: auto
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .elca configuration directory
    pub fn elca_dir(&self) -> PathBuf {
        self.root.join(".elca")
    }

    /// Directory of one kind of reference data
    pub fn reference_dir(&self, kind: &str) -> PathBuf {
        self.root.join("reference").join(kind)
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// Iterate all YAML files below a directory, sorted by path
    pub fn iter_yaml_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files.into_iter()
    }

    /// Path relative to the workspace root, used as cache digest key
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an eLCA workspace (searched from {searched_from:?}). Run 'elca init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("eLCA workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
