//! gf-core: the `glyphforge` command line.
//!
//! Exposed as a library for integration testing.

pub mod attachment;
pub mod cli;
pub mod config;
pub mod imagine;
pub mod logging;
pub mod output;
pub mod progress;
pub mod stack;
pub mod style;
pub mod viewer;
