//! Core module - workspace, configuration, cache and identifiers

pub mod cache;
pub mod config;
pub mod identity;
pub mod loader;
pub mod logging;
pub mod project;

pub use cache::{compute_hash, LcaCache};
pub use config::Config;
pub use identity::{EntityPrefix, IdParseError};
pub use loader::{load_projects, Dataset, ProjectFile};
pub use project::{Project, ProjectError};
