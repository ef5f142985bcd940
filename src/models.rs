//! Data definitions as stored in the database and read by the importer
//!
//! Everything here is keyed by string. [`crate::data::GameData`] resolves
//! these definitions into an arena with integer ids before any solve.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::rational::Rational;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Solid,
    Fluid,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Solid => "solid",
            Phase::Fluid => "fluid",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solid" => Ok(Phase::Solid),
            "fluid" => Ok(Phase::Fluid),
            other => Err(ConfigError::InvalidValue(other.to_string())),
        }
    }
}

/// Closed set of building kinds; each has its own rate formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingKind {
    Crafter { speed: Rational },
    Miner { mining_speed: Rational },
}

impl BuildingKind {
    pub fn name(&self) -> &'static str {
        match self {
            BuildingKind::Crafter { .. } => "crafter",
            BuildingKind::Miner { .. } => "miner",
        }
    }

    pub fn speed(&self) -> &Rational {
        match self {
            BuildingKind::Crafter { speed } => speed,
            BuildingKind::Miner { mining_speed } => mining_speed,
        }
    }

    pub fn from_parts(kind: &str, speed: Rational) -> Result<Self, ConfigError> {
        match kind {
            "crafter" => Ok(BuildingKind::Crafter { speed }),
            "miner" => Ok(BuildingKind::Miner {
                mining_speed: speed,
            }),
            other => Err(ConfigError::InvalidValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDef {
    pub key: String,
    pub name: String,
    pub phase: Phase,
    /// Whether a synthetic last-resort producer is generated for this item.
    pub last_resort: bool,
}

impl ItemDef {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            name: key.to_string(),
            phase: Phase::Solid,
            last_resort: true,
        }
    }

    pub fn fluid(mut self) -> Self {
        self.phase = Phase::Fluid;
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn without_last_resort(mut self) -> Self {
        self.last_resort = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    pub item: String,
    pub amount: Rational,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDef {
    pub key: String,
    pub name: String,
    pub category: Option<String>,
    pub time: Rational,
    /// Raw extraction recipe, eligible for resource priorities.
    pub resource: bool,
    pub ingredients: Vec<Amount>,
    pub products: Vec<Amount>,
}

impl RecipeDef {
    pub fn new(key: &str, time: impl Into<Rational>) -> Self {
        Self {
            key: key.to_string(),
            name: key.to_string(),
            category: None,
            time: time.into(),
            resource: false,
            ingredients: Vec::new(),
            products: Vec::new(),
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn resource(mut self) -> Self {
        self.resource = true;
        self
    }

    pub fn ingredient(mut self, item: &str, amount: impl Into<Rational>) -> Self {
        self.ingredients.push(Amount {
            item: item.to_string(),
            amount: amount.into(),
        });
        self
    }

    pub fn product(mut self, item: &str, amount: impl Into<Rational>) -> Self {
        self.products.push(Amount {
            item: item.to_string(),
            amount: amount.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingDef {
    pub key: String,
    pub name: String,
    pub kind: BuildingKind,
    pub categories: Vec<String>,
    pub module_slots: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDef {
    pub key: String,
    pub name: String,
    pub speed: Rational,
    pub productivity: Rational,
}

/// One entry of the default resource priority list. Lower tiers are spent
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityDef {
    pub tier: usize,
    pub recipe: String,
    pub weight: Rational,
}

/// A complete set of definitions, the unit that is loaded and saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub items: Vec<ItemDef>,
    pub recipes: Vec<RecipeDef>,
    pub buildings: Vec<BuildingDef>,
    pub modules: Vec<ModuleDef>,
    pub priorities: Vec<PriorityDef>,
}
