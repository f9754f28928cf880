//! Storage infrastructure: configuration and icon layout persistence.
//!
//! - `config` reads and writes the TOML configuration file from the
//!   platform-appropriate directory, falling back to defaults on first run.
//! - `icon_store` is the file-backed implementation of the
//!   [`IconStore`](crate::application::icon_sync::IconStore) trait.

pub mod config;
pub mod icon_store;
