//! Pure domain layer: models, naming convention, and errors.

pub mod errors;
pub mod model;
pub mod naming;
