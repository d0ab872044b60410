//! Application command handlers for micwave.
//!
//! # Commands
//! - `record`: Interactive recording with live visualization (default)
//! - `list_devices`: List available audio input devices
//! - `config`: Open configuration file in user's preferred editor
//! - `history`: List saved recordings

pub mod config;
pub mod history;
pub mod list_devices;
pub mod record;

pub use config::handle_config;
pub use history::handle_history;
pub use list_devices::handle_list_devices;
pub use record::{handle_record, RecordArgs};
