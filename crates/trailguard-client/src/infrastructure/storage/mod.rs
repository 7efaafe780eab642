//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration from the
//! platform-appropriate directory, writes it back for `trailguard config
//! init`, and supplies defaults when no file exists yet (first run).

pub mod config;
