//! eLCA: building life cycle assessment
//!
//! Computes environmental indicators (GWP, primary energy, ...) of building
//! projects described in plain YAML files and keeps them in an incrementally
//! updated SQLite result cache, from which reports and benchmark scores are
//! read.

pub mod cli;
pub mod core;
pub mod entities;
pub mod lca;
pub mod yaml;
