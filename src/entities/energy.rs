//! Operational final energy: demands, supplies and reference models

use serde::{Deserialize, Serialize};

use crate::core::identity::{
    FinalEnergyDemandId, FinalEnergyRefModelId, FinalEnergySupplyId, ProcessConfigId,
};

fn default_one() -> f64 {
    1.0
}

/// Annual demand split by use, in kWh per m² net floor area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyUses {
    #[serde(default)]
    pub heating: f64,
    #[serde(default)]
    pub water: f64,
    #[serde(default)]
    pub lighting: f64,
    #[serde(default)]
    pub ventilation: f64,
    #[serde(default)]
    pub cooling: f64,
}

impl EnergyUses {
    pub fn total(&self) -> f64 {
        self.heating + self.water + self.lighting + self.ventilation + self.cooling
    }
}

/// Final energy demand of one energy carrier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEnergyDemand {
    pub id: FinalEnergyDemandId,

    pub process_config_id: ProcessConfigId,

    #[serde(flatten)]
    pub uses: EnergyUses,

    /// Share of the demand covered by this carrier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,

    /// Efficiency factor; unset means 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
}

/// Reference-building demand, same shape as a demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEnergyRefModel {
    pub id: FinalEnergyRefModelId,

    pub process_config_id: ProcessConfigId,

    #[serde(flatten)]
    pub uses: EnergyUses,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
}

/// Energy produced on site and exported, in kWh per year
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEnergySupply {
    pub id: FinalEnergySupplyId,

    pub process_config_id: ProcessConfigId,

    pub quantity: f64,

    #[serde(default = "default_one")]
    pub ratio: f64,

    #[serde(default)]
    pub description: String,
}

/// Absolute demand over the project life time in kWh
pub fn demand_quantity(
    uses: &EnergyUses,
    ratio: Option<f64>,
    efficiency: Option<f64>,
    ngf: f64,
    life_time: u32,
) -> f64 {
    uses.total() * ratio.unwrap_or(1.0) * efficiency.unwrap_or(1.0) * ngf * life_time as f64
}

impl FinalEnergyDemand {
    pub fn quantity(&self, ngf: f64, life_time: u32) -> f64 {
        demand_quantity(&self.uses, self.ratio, self.efficiency, ngf, life_time)
    }
}

impl FinalEnergyRefModel {
    pub fn quantity(&self, ngf: f64, life_time: u32) -> f64 {
        demand_quantity(&self.uses, self.ratio, self.efficiency, ngf, life_time)
    }
}

impl FinalEnergySupply {
    pub fn total_quantity(&self, life_time: u32) -> f64 {
        self.quantity * self.ratio * life_time as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_quantity_sums_uses() {
        let demand = FinalEnergyDemand {
            id: FinalEnergyDemandId(1),
            process_config_id: ProcessConfigId(1),
            uses: EnergyUses {
                heating: 40.0,
                water: 10.0,
                lighting: 5.0,
                ventilation: 3.0,
                cooling: 2.0,
            },
            ratio: None,
            efficiency: None,
        };
        // 60 kWh/m2a * 100 m2 * 50 a
        assert!((demand.quantity(100.0, 50) - 300_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_demand_quantity_applies_ratio_and_efficiency() {
        let uses = EnergyUses {
            heating: 100.0,
            ..Default::default()
        };
        let q = demand_quantity(&uses, Some(0.5), Some(0.8), 10.0, 2);
        assert!((q - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_demand_flattened_yaml() {
        let yaml = "id: 3\nprocess_config_id: 9\nheating: 12.5\nwater: 2\n";
        let demand: FinalEnergyDemand = serde_yml::from_str(yaml).unwrap();
        assert_eq!(demand.uses.heating, 12.5);
        assert_eq!(demand.uses.total(), 14.5);
        assert!(demand.efficiency.is_none());
    }

    #[test]
    fn test_supply_quantity() {
        let supply = FinalEnergySupply {
            id: FinalEnergySupplyId(1),
            process_config_id: ProcessConfigId(2),
            quantity: 1000.0,
            ratio: 0.5,
            description: "PV".to_string(),
        };
        assert_eq!(supply.total_quantity(20), 10_000.0);
    }
}
