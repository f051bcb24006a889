//! Application layer orchestrating domain logic and infrastructure.

pub mod aggregate;
pub mod export;
pub mod generate;
pub mod schedule;
pub mod source;
pub mod synth;
