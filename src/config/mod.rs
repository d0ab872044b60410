//! Configuration management for micwave.
//!
//! Loads and saves application configuration from a TOML file in the user's
//! config directory.

pub mod file;

pub use file::{get_config_path, get_data_dir, AudioConfig, MicwaveConfig, OutputConfig};
