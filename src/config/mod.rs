// src/config/mod.rs

//! Configuration loading and validation for watchgraph.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and follow includes (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Replay a validated config through the orchestrator (`declare.rs`).

pub mod declare;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_graph, package_root, CONFIG_FILE_NAME};
pub use model::{
    BuildConfig, CleanConfig, ConfigFile, ConfigSection, MochaConfig, PackageSection,
    RawConfigFile, WatchFilesConfig,
};
pub use validate::validate_config;
