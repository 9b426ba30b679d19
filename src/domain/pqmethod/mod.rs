//! Fixed-width I/O compatible with the reference Q-methodology tool,
//! plus correlation-benchmark validation against its exports.

mod export;
mod import;
mod validate;

pub use export::{export_factor_arrays, import_factor_arrays};
pub use import::{export_sorts, import_sorts, SortImport};
pub use validate::{
    validate_against_reference, FactorValidation, StatementDelta, ValidationReport,
    REFERENCE_CORRELATION_TARGET,
};
