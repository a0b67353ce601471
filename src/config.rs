//! Settings for the engine and the binary.
//!
//! Settings are read with the `config` crate from an optional file and from
//! `KEYSCHEMA_*` environment variables (nested fields separated by `__`, so
//! `KEYSCHEMA_NAMESPACE__DELIMITER=/` changes the hierarchy delimiter). Every
//! field has a default, so an empty configuration is a valid one.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::matcher::DepthPolicy;
use crate::persist::SqliteStore;
use crate::store::{MemoryStore, Store};

pub const DEFAULT_CONFIG_FILE: &str = "keyschema.toml";

/// Where the schema lives in the store and how hierarchical keys are split.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Namespace {
    /// Ordered set of dimension names.
    pub order_key: String,
    /// Prefix of the ordered set of permitted values, one per dimension.
    pub value_prefix: String,
    pub delimiter: String,
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            order_key: "module:schema:order".into(),
            value_prefix: "module:schema:keys:".into(),
            delimiter: ":".into(),
        }
    }
}

impl Namespace {
    pub fn value_set(&self, dimension: &str) -> String {
        format!("{}{}", self.value_prefix, dimension)
    }
    /// Keys holding the schema itself, which queries never see.
    pub fn owns(&self, key: &str) -> bool {
        key == self.order_key || key.starts_with(&self.value_prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    InMemory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen: String,
    pub persistence: PersistenceMode,
    pub database_file: String,
    pub max_tokens: usize,
    pub depth_policy: DepthPolicy,
    /// A schema document loaded once at startup.
    pub startup_schema: Option<String>,
    pub log_filter: String,
    pub namespace: Namespace,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7380".into(),
            persistence: PersistenceMode::InMemory,
            database_file: "keyschema.db".into(),
            max_tokens: 4096,
            depth_policy: DepthPolicy::Prefix,
            startup_schema: None,
            log_filter: "info".into(),
            namespace: Namespace::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path` (if it exists) and the environment.
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &str, environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn open_store(&self) -> Result<Box<dyn Store + Send>> {
        Ok(match self.persistence {
            PersistenceMode::InMemory => Box::new(MemoryStore::new()),
            PersistenceMode::File => Box::new(SqliteStore::open(&self.database_file)?),
        })
    }
}

// `KEYSCHEMA_` then fields, `__` between nested fields
fn environment() -> Environment {
    Environment::with_prefix("KEYSCHEMA")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_keys_are_owned() {
        let ns = Namespace::default();
        assert!(ns.owns("module:schema:order"));
        assert!(ns.owns(&ns.value_set("env")));
        assert!(!ns.owns("prod:us"));
        assert!(!ns.owns("module:schema"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("does-not-exist.toml").unwrap();
        assert_eq!(settings.max_tokens, 4096);
        assert_eq!(settings.persistence, PersistenceMode::InMemory);
        assert_eq!(settings.namespace, Namespace::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars: config::Map<String, String> = [
            ("KEYSCHEMA_MAX_TOKENS", "8"),
            ("KEYSCHEMA_NAMESPACE__DELIMITER", "/"),
            ("KEYSCHEMA_DEPTH_POLICY", "strict"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        let settings = Settings::load_with("does-not-exist.toml", environment().source(Some(vars))).unwrap();
        assert_eq!(settings.max_tokens, 8);
        assert_eq!(settings.namespace.delimiter, "/");
        assert_eq!(settings.namespace.order_key, "module:schema:order");
        assert_eq!(settings.depth_policy, DepthPolicy::Strict);
    }

    #[test]
    fn doubled_prefix_separator_is_not_read() {
        let vars: config::Map<String, String> =
            [("KEYSCHEMA__MAX_TOKENS".to_owned(), "8".to_owned())].into_iter().collect();
        let settings = Settings::load_with("does-not-exist.toml", environment().source(Some(vars))).unwrap();
        assert_eq!(settings.max_tokens, 4096);
    }
}
