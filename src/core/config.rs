//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::identity::BenchmarkVersionId;
use crate::core::Project;

/// eLCA configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level when no verbosity flag is given
    pub log_level: Option<String>,

    /// Observation period for projects without their own
    pub default_life_time: Option<u32>,

    /// Benchmark version used when none is given on the command line
    pub benchmark_version: Option<BenchmarkVersionId>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        Self::load_for(Project::discover().ok().as_ref())
    }

    /// Load configuration using the config file of a known workspace
    pub fn load_for(project: Option<&Project>) -> Self {
        Self::load_from(
            Self::global_config_path().as_deref(),
            project.map(|p| p.elca_dir().join("config.yaml")).as_deref(),
            |key| std::env::var(key).ok(),
        )
    }

    /// Layer defaults, global file, project file and environment
    fn load_from(
        global_path: Option<&Path>,
        project_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/elca/config.yaml)
        if let Some(global) = global_path.and_then(Self::read_file) {
            config.merge(global);
        }

        // 3. Project config (.elca/config.yaml)
        if let Some(project_config) = project_path.and_then(Self::read_file) {
            config.merge(project_config);
        }

        // 4. Environment variables
        if let Some(level) = env("ELCA_LOG_LEVEL") {
            config.log_level = Some(level);
        }
        if let Some(version) = env("ELCA_BENCHMARK_VERSION").and_then(|v| v.parse().ok()) {
            config.benchmark_version = Some(version);
        }
        if let Some(years) = env("ELCA_DEFAULT_LIFE_TIME").and_then(|v| v.parse().ok()) {
            config.default_life_time = Some(years);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "elca")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.default_life_time.is_some() {
            self.default_life_time = other.default_life_time;
        }
        if other.benchmark_version.is_some() {
            self.benchmark_version = other.benchmark_version;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}
