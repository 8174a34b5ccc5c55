//! Typed identifiers with kind prefixes
//!
//! Reference data and project files use plain integers. On the command line and
//! in log output ids are rendered with a kind prefix (`ELT-12`, `CMP-7`) so a
//! bare number is never ambiguous.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier kind prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Project
    Prj,
    /// Project variant
    Var,
    /// Building element
    Elt,
    /// Element component
    Cmp,
    /// Element type node (DIN 276 tree)
    Etn,
    /// Final energy demand
    Fed,
    /// Final energy supply
    Fes,
    /// Final energy reference model
    Frm,
    /// Transport
    Trn,
    /// Transport mean
    Trm,
    /// Process dataset
    Proc,
    /// Process configuration (material)
    Pcfg,
    /// Process database
    Pdb,
    /// Indicator
    Ind,
    /// Benchmark version
    Bmv,
    /// Cache item
    Ci,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Prj => "PRJ",
            EntityPrefix::Var => "VAR",
            EntityPrefix::Elt => "ELT",
            EntityPrefix::Cmp => "CMP",
            EntityPrefix::Etn => "ETN",
            EntityPrefix::Fed => "FED",
            EntityPrefix::Fes => "FES",
            EntityPrefix::Frm => "FRM",
            EntityPrefix::Trn => "TRN",
            EntityPrefix::Trm => "TRM",
            EntityPrefix::Proc => "PROC",
            EntityPrefix::Pcfg => "PCFG",
            EntityPrefix::Pdb => "PDB",
            EntityPrefix::Ind => "IND",
            EntityPrefix::Bmv => "BMV",
            EntityPrefix::Ci => "CI",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Prj,
            EntityPrefix::Var,
            EntityPrefix::Elt,
            EntityPrefix::Cmp,
            EntityPrefix::Etn,
            EntityPrefix::Fed,
            EntityPrefix::Fes,
            EntityPrefix::Frm,
            EntityPrefix::Trn,
            EntityPrefix::Trm,
            EntityPrefix::Proc,
            EntityPrefix::Pcfg,
            EntityPrefix::Pdb,
            EntityPrefix::Ind,
            EntityPrefix::Bmv,
            EntityPrefix::Ci,
        ]
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == upper)
            .ok_or_else(|| IdParseError::InvalidPrefix(s.to_string()))
    }
}

/// Split `PREFIX-N` (or a bare `N`) and check the prefix against `expected`
fn parse_prefixed(s: &str, expected: EntityPrefix) -> Result<i64, IdParseError> {
    let number = match s.split_once('-') {
        Some((prefix_str, number)) => {
            let prefix: EntityPrefix = prefix_str.parse()?;
            if prefix != expected {
                return Err(IdParseError::WrongPrefix {
                    expected,
                    found: prefix,
                });
            }
            number
        }
        None => s,
    };

    number
        .trim()
        .parse::<i64>()
        .map_err(|_| IdParseError::InvalidNumber(number.to_string()))
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident($inner:ty) => $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// The kind prefix used when rendering this id
            pub const PREFIX: EntityPrefix = $prefix;

            /// Raw numeric value as stored in the cache
            pub fn raw(&self) -> i64 {
                self.0 as i64
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = parse_prefixed(s, Self::PREFIX)?;
                <$inner>::try_from(raw)
                    .map($name)
                    .map_err(|_| IdParseError::InvalidNumber(s.to_string()))
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                $name(value)
            }
        }
    };
}

typed_id!(
    /// Project identifier
    ProjectId(u32) => EntityPrefix::Prj
);
typed_id!(
    /// Project variant identifier
    VariantId(u32) => EntityPrefix::Var
);
typed_id!(
    /// Building element identifier
    ElementId(u32) => EntityPrefix::Elt
);
typed_id!(
    /// Element component identifier
    ComponentId(u32) => EntityPrefix::Cmp
);
typed_id!(
    /// Element type node identifier
    ElementTypeNodeId(u32) => EntityPrefix::Etn
);
typed_id!(
    /// Final energy demand identifier
    FinalEnergyDemandId(u32) => EntityPrefix::Fed
);
typed_id!(
    /// Final energy supply identifier
    FinalEnergySupplyId(u32) => EntityPrefix::Fes
);
typed_id!(
    /// Final energy reference model identifier
    FinalEnergyRefModelId(u32) => EntityPrefix::Frm
);
typed_id!(
    /// Transport identifier
    TransportId(u32) => EntityPrefix::Trn
);
typed_id!(
    /// Transport mean identifier
    TransportMeanId(u32) => EntityPrefix::Trm
);
typed_id!(
    /// Process dataset identifier
    ProcessId(u32) => EntityPrefix::Proc
);
typed_id!(
    /// Process configuration identifier
    ProcessConfigId(u32) => EntityPrefix::Pcfg
);
typed_id!(
    /// Process database identifier
    ProcessDbId(u32) => EntityPrefix::Pdb
);
typed_id!(
    /// Indicator identifier
    IndicatorId(u32) => EntityPrefix::Ind
);
typed_id!(
    /// Benchmark version identifier
    BenchmarkVersionId(u32) => EntityPrefix::Bmv
);
typed_id!(
    /// Cache item identifier (SQLite rowid)
    CacheItemId(i64) => EntityPrefix::Ci
);

/// Errors that can occur when parsing identifiers
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid id prefix: '{0}' (valid: PRJ, VAR, ELT, CMP, ETN, FED, FES, FRM, TRN, TRM, PROC, PCFG, PDB, IND, BMV, CI)")]
    InvalidPrefix(String),

    #[error("expected a {expected} id, got a {found} id")]
    WrongPrefix {
        expected: EntityPrefix,
        found: EntityPrefix,
    },

    #[error("invalid id number: '{0}'")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_uses_prefix() {
        assert_eq!(ElementId(12).to_string(), "ELT-12");
        assert_eq!(ProcessConfigId(3).to_string(), "PCFG-3");
        assert_eq!(CacheItemId(99).to_string(), "CI-99");
    }

    #[test]
    fn test_id_parsing_accepts_prefixed_and_bare() {
        assert_eq!("ELT-12".parse::<ElementId>().unwrap(), ElementId(12));
        assert_eq!("elt-12".parse::<ElementId>().unwrap(), ElementId(12));
        assert_eq!("12".parse::<ElementId>().unwrap(), ElementId(12));
    }

    #[test]
    fn test_id_parsing_rejects_wrong_prefix() {
        let err = "CMP-4".parse::<ElementId>().unwrap_err();
        assert!(matches!(err, IdParseError::WrongPrefix { .. }));
    }

    #[test]
    fn test_id_parsing_rejects_unknown_prefix() {
        let err = "XXX-4".parse::<ElementId>().unwrap_err();
        assert!(matches!(err, IdParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_id_parsing_rejects_negative_for_unsigned() {
        let err = "ELT--3".parse::<ElementId>().unwrap_err();
        assert!(matches!(err, IdParseError::InvalidNumber(_)));
    }

    #[test]
    fn test_all_prefixes_parse() {
        for prefix in EntityPrefix::all() {
            let parsed: EntityPrefix = prefix.as_str().parse().unwrap();
            assert_eq!(parsed, *prefix);
        }
    }

    #[test]
    fn test_ids_deserialize_from_plain_numbers() {
        let id: ComponentId = serde_yml::from_str("42").unwrap();
        assert_eq!(id, ComponentId(42));
    }
}
