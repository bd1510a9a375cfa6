//! Settings read through the `config` crate, and logging setup.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `RESCORE_`-prefixed environment variables, e.g. `RESCORE_LOG_FILTER=debug`
//!
//! ```toml
//! log_filter = "rescore=debug"
//! default_nil_items = false
//!
//! [aliases]
//! money = "decimal"
//! tags = "{array, string}"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log_filter: String,
    /// alias name to type reference, in the textual `TypeRef` form
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// `nil_items?` for arrays that do not say
    #[serde(default)]
    pub default_nil_items: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: String::from("info"),
            aliases: BTreeMap::new(),
            default_nil_items: false,
        }
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(Config::builder()
        .set_default("log_filter", "info")?
        .set_default("default_nil_items", false)?)
}

impl Settings {
    /// Loads from the optional file at `path` and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix("RESCORE"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Loads from TOML text only, ignoring the environment.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let settings = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, or by the settings
/// when that is unset. Returns false if a subscriber was already installed.
pub fn init_logging(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
