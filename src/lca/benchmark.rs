//! Benchmark scores from aggregated indicator totals
//!
//! Totals are expected per m² net floor area and year. One
//! [`BenchmarkNormalizer`] serves exactly one [`BenchmarkVersion`].

use std::collections::{BTreeMap, HashMap};

use crate::entities::benchmark::{BenchmarkVersion, Threshold};
use crate::entities::indicator::{PENRT, PERT, PE_EM, PE_N_EM};

/// Renewable primary energy idents and their non-renewable counterparts
const RENEWABLE_PAIRS: [(&str, &str); 2] = [(PERT, PENRT), (PE_EM, PE_N_EM)];

fn renewable_counterpart(ident: &str) -> Option<&'static str> {
    RENEWABLE_PAIRS
        .iter()
        .find(|(renewable, _)| renewable.eq_ignore_ascii_case(ident))
        .map(|(_, non_renewable)| *non_renewable)
}

fn lookup(values: &BTreeMap<String, f64>, ident: &str) -> Option<f64> {
    values
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(ident))
        .map(|(_, v)| *v)
}

/// Piecewise-linear score for `value`, clamped at both table ends
///
/// The table is ordered from the worst to the best score.
fn interpolate(table: &[Threshold], value: f64) -> Option<f64> {
    let first = table.first()?;
    let last = table.last()?;
    if table.len() == 1 || first.value == last.value {
        return Some(last.score);
    }

    let direction = (last.value - first.value).signum();
    if (value - first.value) * direction <= 0.0 {
        return Some(first.score);
    }
    if (value - last.value) * direction >= 0.0 {
        return Some(last.score);
    }

    for pair in table.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if (value - hi.value) * direction <= 0.0 {
            if hi.value == lo.value {
                return Some(hi.score);
            }
            let t = (value - lo.value) / (hi.value - lo.value);
            return Some(lo.score + t * (hi.score - lo.score));
        }
    }
    Some(last.score)
}

pub struct BenchmarkNormalizer {
    version: BenchmarkVersion,
    tables: HashMap<String, Vec<Threshold>>,
}

impl BenchmarkNormalizer {
    pub fn new(version: BenchmarkVersion) -> Self {
        Self {
            version,
            tables: HashMap::new(),
        }
    }

    pub fn version(&self) -> &BenchmarkVersion {
        &self.version
    }

    /// Threshold table of an indicator ordered from worst to best score
    ///
    /// Renewable primary energy is higher-is-better (values ascending),
    /// everything else lower-is-better (values descending).
    pub fn table(&mut self, ident: &str) -> Option<&[Threshold]> {
        let key = ident.to_ascii_lowercase();
        if !self.tables.contains_key(&key) {
            let mut table = self.version.thresholds_for(ident)?.to_vec();
            if renewable_counterpart(ident).is_some() {
                table.sort_by(|a, b| a.value.total_cmp(&b.value));
            } else {
                table.sort_by(|a, b| b.value.total_cmp(&a.value));
            }
            self.tables.insert(key.clone(), table);
        }
        self.tables.get(&key).map(|t| t.as_slice())
    }

    /// Scores for every indicator with a threshold table
    pub fn compute_indicators(&mut self, values: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        self.score(values, values)
    }

    /// Scores on the version's pathway
    ///
    /// Fixed values rate `totals` directly. The reference-model pathway rates
    /// each total as a percentage of reference construction plus
    /// `reference_operation`.
    pub fn compute(
        &mut self,
        totals: &BTreeMap<String, f64>,
        reference_operation: &BTreeMap<String, f64>,
    ) -> BTreeMap<String, f64> {
        if !self.version.use_reference_model {
            return self.compute_indicators(totals);
        }

        let mut relative = BTreeMap::new();
        for (ident, total) in totals {
            let baseline = self.baseline(ident, reference_operation);
            if baseline > 0.0 {
                relative.insert(ident.clone(), total / baseline * 100.0);
            }
        }
        self.score(&relative, totals)
    }

    /// Absolute values to reach per score level
    pub fn compute_projection(
        &mut self,
        reference_operation: &BTreeMap<String, f64>,
    ) -> BTreeMap<String, Vec<Threshold>> {
        let idents: Vec<String> = self.version.thresholds.keys().cloned().collect();
        let mut projection = BTreeMap::new();

        for ident in idents {
            let scale = if self.version.use_reference_model
                && renewable_counterpart(&ident).is_none()
            {
                Some(self.baseline(&ident, reference_operation) / 100.0)
            } else {
                None
            };

            let Some(table) = self.table(&ident) else {
                continue;
            };
            let levels = table
                .iter()
                .map(|t| Threshold {
                    score: t.score,
                    value: scale.map_or(t.value, |s| t.value * s),
                })
                .collect();
            projection.insert(ident, levels);
        }
        projection
    }

    fn baseline(&self, ident: &str, reference_operation: &BTreeMap<String, f64>) -> f64 {
        self.version.ref_construction_for(ident).unwrap_or(0.0)
            + lookup(reference_operation, ident).unwrap_or(0.0)
    }

    /// `values` are rated, `raw` feeds the renewable share
    fn score(
        &mut self,
        values: &BTreeMap<String, f64>,
        raw: &BTreeMap<String, f64>,
    ) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();

        for (ident, value) in values {
            if renewable_counterpart(ident).is_some() {
                continue;
            }
            if let Some(score) = self.table(ident).and_then(|t| interpolate(t, *value)) {
                scores.insert(ident.clone(), score);
            }
        }

        for (renewable, non_renewable) in RENEWABLE_PAIRS {
            let (Some(r), Some(n)) = (lookup(raw, renewable), lookup(raw, non_renewable)) else {
                continue;
            };
            if r + n == 0.0 {
                continue;
            }
            let share = r / (r + n) * 100.0;
            if let Some(score) = self.table(renewable).and_then(|t| interpolate(t, share)) {
                scores.insert(renewable.to_string(), score);
            }
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::BenchmarkVersionId;

    fn version(use_reference_model: bool) -> BenchmarkVersion {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(
            "gwp".to_string(),
            vec![
                Threshold { score: 100.0, value: 8.0 },
                Threshold { score: 10.0, value: 24.0 },
                Threshold { score: 50.0, value: 16.0 },
            ],
        );
        thresholds.insert(
            "pert".to_string(),
            vec![
                Threshold { score: 100.0, value: 30.0 },
                Threshold { score: 10.0, value: 5.0 },
            ],
        );
        let mut ref_construction = BTreeMap::new();
        ref_construction.insert("gwp".to_string(), 10.0);

        BenchmarkVersion {
            id: BenchmarkVersionId(1),
            name: "Test".to_string(),
            use_reference_model,
            thresholds,
            ref_construction,
        }
    }

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_table_order_depends_on_direction() {
        let mut normalizer = BenchmarkNormalizer::new(version(false));
        let gwp: Vec<f64> = normalizer.table("gwp").unwrap().iter().map(|t| t.value).collect();
        assert_eq!(gwp, vec![24.0, 16.0, 8.0]);
        let pert: Vec<f64> = normalizer.table("PERT").unwrap().iter().map(|t| t.value).collect();
        assert_eq!(pert, vec![5.0, 30.0]);
        assert!(normalizer.table("odp").is_none());
    }

    #[test]
    fn test_interpolation_and_clamping() {
        let mut normalizer = BenchmarkNormalizer::new(version(false));

        let scores = normalizer.compute_indicators(&values(&[("gwp", 12.0)]));
        assert!((scores["gwp"] - 75.0).abs() < 1e-9);

        let scores = normalizer.compute_indicators(&values(&[("gwp", 4.0)]));
        assert_eq!(scores["gwp"], 100.0);

        let scores = normalizer.compute_indicators(&values(&[("gwp", 40.0)]));
        assert_eq!(scores["gwp"], 10.0);
    }

    #[test]
    fn test_renewable_share() {
        let mut normalizer = BenchmarkNormalizer::new(version(false));
        // 20 / (20 + 80) = 20 %
        let scores = normalizer.compute_indicators(&values(&[("pert", 20.0), ("penrt", 80.0)]));
        assert!((scores["pert"] - 64.0).abs() < 1e-9);
        assert!(!scores.contains_key("penrt"));
    }

    #[test]
    fn test_reference_model_pathway() {
        let mut normalizer = BenchmarkNormalizer::new(version(true));
        let reference_operation = values(&[("gwp", 10.0)]);

        // 1.6 of a 20.0 baseline = 8 %
        let scores = normalizer.compute(&values(&[("gwp", 1.6)]), &reference_operation);
        assert!((scores["gwp"] - 100.0).abs() < 1e-9);

        let scores = normalizer.compute(&values(&[("gwp", 3.2)]), &reference_operation);
        assert!((scores["gwp"] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection() {
        let mut fixed = BenchmarkNormalizer::new(version(false));
        let projection = fixed.compute_projection(&BTreeMap::new());
        assert_eq!(projection["gwp"][0].value, 24.0);

        let mut relative = BenchmarkNormalizer::new(version(true));
        let projection = relative.compute_projection(&values(&[("gwp", 10.0)]));
        let gwp = &projection["gwp"];
        assert!((gwp[0].value - 4.8).abs() < 1e-9);
        assert!((gwp[2].value - 1.6).abs() < 1e-9);
        assert_eq!(projection["pert"][1].value, 30.0);
    }
}
