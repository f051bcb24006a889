//! Infrastructure adapters for the Figma API, SVG conversion, config, and file output.

pub mod config;
pub mod figma;
pub mod format;
pub mod fs;
pub mod logging;
pub mod svg;
