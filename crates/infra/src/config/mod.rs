//! Configuration loading
//!
//! Environment first, then a discovered config file. See [`loader`] for the
//! recognised keys and locations.

pub mod loader;

pub use loader::{discover_config_paths, load, load_from_env, load_from_file};
