//! Warning flags and reporting limits.
//!
//! Flags are read from an optional JSON file, e.g.
//!
//! ```json
//! { "Wunused": false, "Wshadow": true, "max_errors": 50 }
//! ```
//!
//! Missing keys fall back to [`Flags::default`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// Default cap on recorded diagnostics before a caller should stop reporting.
pub const MAX_ERRORS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// Warn about locals that are declared but never read.
    #[serde(rename = "Wunused")]
    pub warn_unused: bool,

    /// Warn when a declaration shadows a binding from an outer scope.
    #[serde(rename = "Wshadow")]
    pub warn_shadow: bool,

    pub max_errors: usize,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            warn_unused: true,
            warn_shadow: true,
            max_errors: MAX_ERRORS,
        }
    }
}

impl Flags {
    /// All lints disabled; used where warnings would only be noise.
    pub fn quiet() -> Self {
        Self {
            warn_unused: false,
            warn_shadow: false,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid flags file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading flags from {:?}", path);

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read flags file {:?}", path))?;

        Self::from_json(&text)
    }
}
