//! Environmental impact indicators

use serde::{Deserialize, Serialize};

use crate::core::identity::IndicatorId;

/// Ident of the derived total primary energy indicator
pub const PET: &str = "pet";
/// Renewable primary energy (EN 15804)
pub const PERT: &str = "pert";
/// Non-renewable primary energy (EN 15804)
pub const PENRT: &str = "penrt";
/// Renewable primary energy (legacy accounting)
pub const PE_EM: &str = "pe_em";
/// Non-renewable primary energy (legacy accounting)
pub const PE_N_EM: &str = "pe_n_em";

/// An impact category from the reference dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,

    /// Short code, e.g. `gwp`, `odp`, `penrt`
    pub ident: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub unit: String,

    /// Display order within reports
    #[serde(default)]
    pub position: u32,
}

impl Indicator {
    pub fn is_pet(&self) -> bool {
        self.ident.eq_ignore_ascii_case(PET)
    }

    /// Whether this indicator is summed into PET under the given standard
    pub fn is_pet_member(&self, en15804: bool) -> bool {
        let (renewable, non_renewable) = pet_members(en15804);
        self.ident.eq_ignore_ascii_case(renewable) || self.ident.eq_ignore_ascii_case(non_renewable)
    }

    /// Renewable primary energy indicators (either standard)
    pub fn is_renewable_primary_energy(&self) -> bool {
        self.ident.eq_ignore_ascii_case(PERT) || self.ident.eq_ignore_ascii_case(PE_EM)
    }
}

/// The (renewable, non-renewable) primary energy pair PET is derived from
pub fn pet_members(en15804: bool) -> (&'static str, &'static str) {
    if en15804 {
        (PERT, PENRT)
    } else {
        (PE_EM, PE_N_EM)
    }
}
