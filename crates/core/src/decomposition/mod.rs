mod compare;
mod components;
pub mod covariance;
mod rsquared;
mod single;
mod table;

pub use compare::{compare, Comparison};
pub use components::VarianceComponents;
pub use covariance::{CovarianceStructures, RandomStructure, ResolvedSelection, Structure};
pub use rsquared::Tables;
pub use single::{decompose, Decomposition};
pub use table::{Component, Level, LevelRow, LevelTable, Measure};
