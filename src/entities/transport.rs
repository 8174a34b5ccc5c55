//! Transports of building materials to site

use serde::{Deserialize, Serialize};

use crate::core::identity::{ProcessConfigId, TransportId, TransportMeanId};

fn default_true() -> bool {
    true
}

/// One leg of a transport, e.g. truck or rail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMean {
    pub id: TransportMeanId,

    pub process_config_id: ProcessConfigId,

    /// Distance in km
    pub distance: f64,

    /// Load factor; unset means 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
}

/// A load carried to site by one or more means
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub id: TransportId,

    #[serde(default)]
    pub name: String,

    /// Carried mass in t
    pub quantity: f64,

    #[serde(default = "default_true")]
    pub calc_lca: bool,

    #[serde(default)]
    pub means: Vec<TransportMean>,
}

impl Transport {
    /// Transport performance of one mean in t·km
    pub fn performance(&self, mean: &TransportMean) -> f64 {
        self.quantity * mean.distance * mean.efficiency.unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance() {
        let transport = Transport {
            id: TransportId(1),
            name: "Concrete".to_string(),
            quantity: 20.0,
            calc_lca: true,
            means: vec![],
        };
        let mean = TransportMean {
            id: TransportMeanId(1),
            process_config_id: ProcessConfigId(3),
            distance: 50.0,
            efficiency: Some(0.5),
        };
        assert_eq!(transport.performance(&mean), 500.0);

        let full = TransportMean {
            efficiency: None,
            ..mean
        };
        assert_eq!(transport.performance(&full), 1000.0);
    }
}
