//! Configuration for sshkey-codec
//!
//! Handles:
//! - Persisted command-line defaults
//! - Writing key files with restrictive permissions

mod settings;
mod storage;

pub use settings::Settings;
pub use storage::{
    default_config_path, load_settings, public_key_path, save_settings, write_private_file,
    write_public_file,
};
