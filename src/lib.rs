//! Rate Solver
//!
//! Exact production rate calculator for factory-building games. Every
//! quantity is an arbitrary-precision rational, so rates, building counts
//! and item flows never pick up floating-point drift.
//!
//! A solve takes a [`Spec`] (game data plus per-solve settings) and a list
//! of [`BuildTarget`]s. Simple chains are resolved directly; loops,
//! alternative recipes and multi-product recipes go through a linear
//! program solved with an exact simplex.

pub mod cycle;
pub mod data;
pub mod db;
pub mod error;
pub mod import;
pub mod matrix;
pub mod models;
pub mod priority;
pub mod rational;
pub mod simplex;
pub mod solve;
pub mod spec;
pub mod tableau;
pub mod totals;

pub use data::{BuildingId, GameData, ItemId, ModuleId, RecipeId};
pub use error::{ConfigError, Error, Result};
pub use matrix::Matrix;
pub use priority::PriorityList;
pub use rational::Rational;
pub use simplex::Simplex;
pub use solve::{BuildTarget, Solver, TargetAmount, solve};
pub use spec::Spec;
pub use tableau::TableauDebug;
pub use totals::{Edge, RateUnit, Step, Totals};
