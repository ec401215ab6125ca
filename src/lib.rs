pub mod boundary;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod geometry;
pub mod global_variables;
pub mod io;
pub mod lattice;
pub mod post;
pub mod resolution;
pub mod units;

pub use error::{CaseError, Result};
pub use global_variables::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellFlag {
    #[default]
    Fluid = 0,
    Solid = 1,
    /// Free inflow/outflow cell whose values are held at equilibrium.
    OpenBoundary = 2,
}
