//! Configuration module for OpsKit
//!
//! Provides the CLI definition and helpers for loading
//! JSON and YAML config files.

mod settings;

pub use settings::*;
