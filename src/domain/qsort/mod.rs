//! Q-sort input model: forced-distribution grid, validated response
//! matrix, and the participant correlation builder.

mod correlation;
mod grid;
mod matrix;

pub use correlation::CorrelationMatrix;
pub use grid::{DistributionGrid, GridColumn};
pub use matrix::QSortMatrix;
