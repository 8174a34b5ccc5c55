//! Benchmark versions and their threshold tables

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::identity::BenchmarkVersionId;

/// One row of a threshold table: reaching `value` earns `score`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub score: f64,
    pub value: f64,
}

/// A rating system release (e.g. a certification scheme version)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkVersion {
    pub id: BenchmarkVersionId,

    pub name: String,

    /// Rate against a reference building instead of fixed values
    #[serde(default)]
    pub use_reference_model: bool,

    /// Indicator ident -> threshold table
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<Threshold>>,

    /// Indicator ident -> reference construction value per m² and year
    #[serde(default)]
    pub ref_construction: BTreeMap<String, f64>,
}

impl BenchmarkVersion {
    pub fn thresholds_for(&self, ident: &str) -> Option<&[Threshold]> {
        self.thresholds
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(ident))
            .map(|(_, v)| v.as_slice())
    }

    pub fn ref_construction_for(&self, ident: &str) -> Option<f64> {
        self.ref_construction
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(ident))
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_yaml() {
        let yaml = r#"
id: 3
name: "BNB 2015"
thresholds:
  gwp:
    - { score: 10, value: 24.15 }
    - { score: 100, value: 8.05 }
ref_construction:
  gwp: 9.4
"#;
        let version: BenchmarkVersion = serde_yml::from_str(yaml).unwrap();
        assert!(!version.use_reference_model);
        assert_eq!(version.thresholds_for("GWP").unwrap().len(), 2);
        assert_eq!(version.ref_construction_for("gwp"), Some(9.4));
        assert!(version.thresholds_for("odp").is_none());
    }
}
