// src/config/mod.rs

//! Configuration for intemp.
//!
//! Responsibilities:
//! - Define the optional TOML config file model (`model.rs`).
//! - Load and validate it from disk (`loader.rs`).
//! - Merge it under the command-line flags into [`RunSettings`] (`settings.rs`).

pub mod loader;
pub mod model;
pub mod settings;

pub use loader::{discover, load_and_validate, load_from_path};
pub use model::{ConfigFile, DefaultsSection, RawConfigFile};
pub use settings::RunSettings;
