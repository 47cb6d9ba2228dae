//! Configuration read from the environment (after loading `.env`).
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `GOOGLE_API_KEY` / `GEMINI_API_KEY` | generation API key, required | |
//! | `HIVE_MODEL` | generation model | `gemini-1.5-flash` |
//! | `HIVE_STORE` | `memory`, `sqlite://<path>` or a PostgREST `https://` URL | `sqlite://hive.db` |
//! | `SUPABASE_KEY` | service key for a PostgREST store | |
//! | `HIVE_TABLE` | story table name | `story_logs` |
//! | `HIVE_MODERATION` | enable the moderation gate | `true` |
//! | `HIVE_CONTEXT_TURNS` | turns shown to the narrator | `20` |

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::narrator::DEFAULT_CONTEXT_TURNS;
use crate::store::sqlite_path_from_url;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_STORE: &str = "sqlite://hive.db";
pub const DEFAULT_TABLE: &str = "story_logs";

/// Everything the binary needs to build a session.
#[derive(Debug, Clone)]
pub struct HiveConfig {
    pub api_key: SecretString,
    pub model: String,
    pub store: StoreConfig,
    pub moderation: bool,
    pub context_turns: usize,
}

/// Which story store backend to use.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory,
    Sqlite { path: String, table: String },
    Postgrest {
        url: String,
        key: SecretString,
        table: String,
    },
}

impl HiveConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(optional_env)
    }

    /// Build a config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let get = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok(lookup(key)?.filter(|v| !v.trim().is_empty()))
        };

        let api_key = match get("GOOGLE_API_KEY")? {
            Some(key) => key,
            None => get("GEMINI_API_KEY")?.ok_or_else(|| ConfigError::Missing {
                key: "GOOGLE_API_KEY".to_string(),
            })?,
        };

        let table = get("HIVE_TABLE")?.unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let store_url = get("HIVE_STORE")?.unwrap_or_else(|| DEFAULT_STORE.to_string());
        let store = StoreConfig::parse(&store_url, get("SUPABASE_KEY")?, &table)?;

        let moderation = match get("HIVE_MODERATION")? {
            Some(raw) => parse_bool("HIVE_MODERATION", &raw)?,
            None => true,
        };

        let context_turns = parse_optional(
            "HIVE_CONTEXT_TURNS",
            get("HIVE_CONTEXT_TURNS")?,
            DEFAULT_CONTEXT_TURNS,
        )?;
        if context_turns == 0 {
            return Err(ConfigError::invalid("HIVE_CONTEXT_TURNS", "must be at least 1"));
        }

        Ok(Self {
            api_key: SecretString::from(api_key),
            model: get("HIVE_MODEL")?.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            store,
            moderation,
            context_turns,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_moderation(mut self, moderation: bool) -> Self {
        self.moderation = moderation;
        self
    }

    pub fn with_context_turns(mut self, context_turns: usize) -> Self {
        self.context_turns = context_turns.max(1);
        self
    }
}

impl StoreConfig {
    /// Interpret a `HIVE_STORE` value.
    ///
    /// A PostgREST URL needs the service key; the other backends ignore it.
    pub fn parse(raw: &str, key: Option<String>, table: &str) -> Result<Self, ConfigError> {
        validate_table(table)?;
        let raw = raw.trim();

        if raw == "memory" {
            return Ok(StoreConfig::Memory);
        }
        if raw.starts_with("sqlite:") {
            return Ok(StoreConfig::Sqlite {
                path: sqlite_path_from_url(raw),
                table: table.to_string(),
            });
        }
        if raw.starts_with("https://") || raw.starts_with("http://") {
            let key = key.ok_or_else(|| ConfigError::Missing {
                key: "SUPABASE_KEY".to_string(),
            })?;
            return Ok(StoreConfig::Postgrest {
                url: raw.to_string(),
                key: SecretString::from(key),
                table: table.to_string(),
            });
        }

        Err(ConfigError::invalid(
            "HIVE_STORE",
            format!("expected `memory`, `sqlite://<path>` or an https URL, got {raw:?}"),
        ))
    }

    /// Whether the log outlives the process.
    pub fn is_persistent(&self) -> bool {
        match self {
            StoreConfig::Memory => false,
            StoreConfig::Sqlite { path, .. } => path != ":memory:" && path != "memory",
            StoreConfig::Postgrest { .. } => true,
        }
    }

    /// Short description without secrets.
    pub fn describe(&self) -> String {
        match self {
            StoreConfig::Memory => "memory".to_string(),
            StoreConfig::Sqlite { path, .. } => format!("sqlite://{path}"),
            StoreConfig::Postgrest { url, .. } => url.clone(),
        }
    }
}

/// Read one process environment variable; empty counts as unset.
fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::invalid(key, format!("failed to read: {e}"))),
    }
}

fn parse_optional<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|s| s.trim().parse().map_err(|e| ConfigError::invalid(key, format!("{e}"))))
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("expected true or false, got {other:?}"))),
    }
}

/// Table names are spliced into SQL and URLs, so only plain identifiers pass.
fn validate_table(table: &str) -> Result<(), ConfigError> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid("HIVE_TABLE", format!("not a plain identifier: {table:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<HiveConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HiveConfig::from_lookup(|key| Ok(vars.get(key).cloned()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("GOOGLE_API_KEY", "k")]).unwrap();
        assert_eq!(config.api_key.expose_secret(), "k");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.moderation);
        assert_eq!(config.context_turns, 20);
        assert!(matches!(
            config.store,
            StoreConfig::Sqlite { ref path, ref table } if path == "hive.db" && table == "story_logs"
        ));
    }

    #[test]
    fn test_missing_key() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == "GOOGLE_API_KEY"));
        assert_eq!(err.to_string(), "GOOGLE_API_KEY is not set");

        assert!(config_from(&[("GOOGLE_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_gemini_key_fallback() {
        let config = config_from(&[("GEMINI_API_KEY", "g")]).unwrap();
        assert_eq!(config.api_key.expose_secret(), "g");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("HIVE_MODEL", "gemini-2.0-flash"),
            ("HIVE_STORE", "memory"),
            ("HIVE_MODERATION", "off"),
            ("HIVE_CONTEXT_TURNS", "8"),
        ])
        .unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert!(matches!(config.store, StoreConfig::Memory));
        assert!(!config.moderation);
        assert_eq!(config.context_turns, 8);
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("GOOGLE_API_KEY", "k"), ("HIVE_MODERATION", "maybe")]).is_err());
        assert!(config_from(&[("GOOGLE_API_KEY", "k"), ("HIVE_CONTEXT_TURNS", "many")]).is_err());
        assert!(config_from(&[("GOOGLE_API_KEY", "k"), ("HIVE_CONTEXT_TURNS", "0")]).is_err());
        assert!(config_from(&[("GOOGLE_API_KEY", "k"), ("HIVE_STORE", "ftp://x")]).is_err());
        assert!(config_from(&[("GOOGLE_API_KEY", "k"), ("HIVE_TABLE", "logs; DROP TABLE x")]).is_err());
    }

    #[test]
    fn test_postgrest_requires_service_key() {
        let err = StoreConfig::parse("https://abc.supabase.co", None, DEFAULT_TABLE).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == "SUPABASE_KEY"));

        let store =
            StoreConfig::parse("https://abc.supabase.co", Some("s".to_string()), "tales").unwrap();
        assert!(matches!(store, StoreConfig::Postgrest { ref table, .. } if table == "tales"));
        assert_eq!(store.describe(), "https://abc.supabase.co");
    }

    #[test]
    fn test_sqlite_memory_url() {
        let store = StoreConfig::parse("sqlite::memory:", None, DEFAULT_TABLE).unwrap();
        assert!(matches!(store, StoreConfig::Sqlite { ref path, .. } if path == ":memory:"));
        assert!(!store.is_persistent());
        assert!(!StoreConfig::Memory.is_persistent());
        assert!(StoreConfig::parse("sqlite://hive.db", None, DEFAULT_TABLE)
            .unwrap()
            .is_persistent());
    }
}
