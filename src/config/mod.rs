//! Configuration module for typeql.
//!
//! Handles the `typeql.toml` settings file: default dialect, output layout and
//! custom dialect definitions.

mod settings;

pub use settings::{CompilerSettings, Settings, SettingsError};
