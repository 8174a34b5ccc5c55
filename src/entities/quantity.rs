//! Quantities, units and unit conversion chains

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic unit of a quantity
///
/// Reference data uses short textual units. Well-known units get their own
/// variant, anything else is kept verbatim so foreign datasets still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    Kg,
    Metre,
    SquareMetre,
    CubicMetre,
    Piece,
    KilowattHour,
    Megajoule,
    Tonne,
    TonneKilometre,
    Year,
    Other(String),
}

impl Unit {
    pub fn as_str(&self) -> &str {
        match self {
            Unit::Kg => "kg",
            Unit::Metre => "m",
            Unit::SquareMetre => "m2",
            Unit::CubicMetre => "m3",
            Unit::Piece => "piece",
            Unit::KilowattHour => "kWh",
            Unit::Megajoule => "MJ",
            Unit::Tonne => "t",
            Unit::TonneKilometre => "tkm",
            Unit::Year => "a",
            Unit::Other(s) => s,
        }
    }
}

impl From<String> for Unit {
    fn from(s: String) -> Self {
        match s.as_str() {
            "kg" => Unit::Kg,
            "m" => Unit::Metre,
            "m2" | "m²" => Unit::SquareMetre,
            "m3" | "m³" => Unit::CubicMetre,
            "piece" | "pcs" | "Stück" => Unit::Piece,
            "kWh" | "kwh" => Unit::KilowattHour,
            "MJ" | "mj" => Unit::Megajoule,
            "t" => Unit::Tonne,
            "tkm" => Unit::TonneKilometre,
            "a" => Unit::Year,
            _ => Unit::Other(s),
        }
    }
}

impl From<&str> for Unit {
    fn from(s: &str) -> Self {
        Unit::from(s.to_string())
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.as_str().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A numeric value tagged with its unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<Unit>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Scale the value, keeping the unit
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            unit: self.unit.clone(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// `1 in_unit = factor out_unit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub in_unit: Unit,
    pub out_unit: Unit,
    pub factor: f64,
}

/// Resolves conversion factors between the units of one process configuration
#[derive(Debug, Clone, Default)]
pub struct Converter {
    edges: HashMap<Unit, Vec<(Unit, f64)>>,
}

impl Converter {
    pub fn new(conversions: &[Conversion]) -> Self {
        let mut edges: HashMap<Unit, Vec<(Unit, f64)>> = HashMap::new();
        for c in conversions {
            if c.factor == 0.0 || !c.factor.is_finite() {
                continue;
            }
            edges
                .entry(c.in_unit.clone())
                .or_default()
                .push((c.out_unit.clone(), c.factor));
            edges
                .entry(c.out_unit.clone())
                .or_default()
                .push((c.in_unit.clone(), 1.0 / c.factor));
        }
        Self { edges }
    }

    /// Factor `f` such that `value [from] * f = value [to]`
    ///
    /// Direct and inverse conversions are found first, longer chains are
    /// resolved breadth-first so the shortest path wins.
    pub fn factor(&self, from: &Unit, to: &Unit) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }

        let mut visited: HashSet<&Unit> = HashSet::new();
        let mut queue: VecDeque<(&Unit, f64)> = VecDeque::new();
        visited.insert(from);
        queue.push_back((from, 1.0));

        while let Some((unit, acc)) = queue.pop_front() {
            let Some(neighbours) = self.edges.get(unit) else {
                continue;
            };
            for (next, factor) in neighbours {
                if next == to {
                    return Some(acc * factor);
                }
                if visited.insert(next) {
                    queue.push_back((next, acc * factor));
                }
            }
        }

        None
    }

    /// Convert a quantity into `to`, `None` if no conversion path exists
    pub fn convert(&self, quantity: &Quantity, to: &Unit) -> Option<Quantity> {
        self.factor(&quantity.unit, to).map(|f| Quantity {
            value: quantity.value * f,
            unit: to.clone(),
        })
    }
}
