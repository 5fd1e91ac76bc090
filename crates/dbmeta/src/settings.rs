//! Immutable per-connection configuration snapshot.
//!
//! Properties are keyed `dbmeta.<dialect-id>.<key>` with a
//! `dbmeta.default.<key>` fallback, so one settings file can carry defaults
//! plus dialect-specific overrides. The snapshot is injected into the facade
//! at construction time and never changes afterwards - there is no
//! process-wide observer to subscribe to.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Property namespace prefix for all keys.
const NAMESPACE: &str = "dbmeta";

/// Read-only key/value configuration for the metadata engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbSettings {
    /// Flat property map, e.g. `dbmeta.oracle.ddl_needs_commit: "true"`.
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

impl DbSettings {
    /// An empty snapshot; every lookup falls back to the built-in default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from explicit key/value pairs (mostly for tests).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let properties = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { properties }
    }

    /// Load a snapshot from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a snapshot from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: DbSettings = serde_yaml::from_str(yaml)?;
        Ok(settings)
    }

    /// Raw lookup without dialect fallback.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Look up `dbmeta.<dialect>.<key>`, falling back to
    /// `dbmeta.default.<key>`.
    pub fn get(&self, dialect_id: &str, key: &str) -> Option<&str> {
        self.raw(&format!("{NAMESPACE}.{dialect_id}.{key}"))
            .or_else(|| self.raw(&format!("{NAMESPACE}.default.{key}")))
    }

    /// String property with a default.
    pub fn get_str<'a>(&'a self, dialect_id: &str, key: &str, default: &'a str) -> &'a str {
        self.get(dialect_id, key).unwrap_or(default)
    }

    /// Boolean property. Accepts `true`/`false`, `yes`/`no`, `1`/`0`.
    pub fn get_bool(&self, dialect_id: &str, key: &str, default: bool) -> bool {
        match self.get(dialect_id, key) {
            Some(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
            None => default,
        }
    }

    /// Integer property; unparseable values fall back to the default.
    pub fn get_int(&self, dialect_id: &str, key: &str, default: i64) -> i64 {
        self.get(dialect_id, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Comma-separated list property.
    pub fn get_list(&self, dialect_id: &str, key: &str) -> Vec<String> {
        self.get(dialect_id, key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Compiled regex property.
    ///
    /// An invalid pattern disables only this one feature: it is logged and
    /// treated as absent, never propagated.
    pub fn get_regex(&self, dialect_id: &str, key: &str) -> Option<Regex> {
        let pattern = self.get(dialect_id, key)?;
        match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(key, pattern, "invalid regex in settings, feature disabled: {e}");
                None
            }
        }
    }

    /// Line ending used when emitting generated DDL.
    pub fn line_ending(&self, dialect_id: &str) -> &'static str {
        match self.get_str(dialect_id, "ddl.line_ending", "lf") {
            "crlf" => "\r\n",
            _ => "\n",
        }
    }

    /// Statement delimiter appended to generated DDL statements.
    pub fn statement_delimiter(&self, dialect_id: &str) -> String {
        self.get_str(dialect_id, "ddl.delimiter", ";").to_string()
    }
}
