//! Error types for the solver library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort a solve or an arithmetic operation
#[derive(Debug, Error)]
pub enum Error {
    #[error("division by zero")]
    DivisionByZero,

    #[error("infeasible recipe network: {0}")]
    InfeasibleNetwork(String),

    #[error("unbounded linear program: no ratio-test row for column {column}")]
    Unbounded { column: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Requests rejected before a solve is attempted
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("unknown recipe: {0}")]
    UnknownRecipe(String),

    #[error("unknown building: {0}")]
    UnknownBuilding(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("invalid value: {0:?}")]
    InvalidValue(String),

    #[error("recipe {recipe} does not produce {item}")]
    NotProduced { recipe: String, item: String },

    #[error("recipe {0} has no building to count")]
    NoBuilding(String),

    #[error("recipe {recipe} allows at most {slots} modules")]
    ModuleSlots { recipe: String, slots: usize },

    #[error("building {building} cannot craft recipe {recipe}")]
    IncompatibleBuilding { recipe: String, building: String },
}
