//! YAML parsing with source-located diagnostics

pub mod diagnostics;

pub use diagnostics::{parse_file, parse_str, YamlError, YamlSyntaxError};
