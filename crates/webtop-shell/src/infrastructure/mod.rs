//! Infrastructure layer for the shell.
//!
//! Contains host-facing adapters: input sources and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `webtop_core`.  The application layer only reaches in here for the raw
//! input type it consumes.

pub mod input_source;
pub mod storage;
