//! Named string parameters (API key, secret, budget) fetched per invocation.
//!
//! The store is an injected capability so the buy path can run against an
//! in-memory map in tests and against the environment or a file in production.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Result, TradeError};
use crate::logging::{log, obj, v_str, Domain, Level};

#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Plain-text value of `name`, or `MissingParameter`.
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// Where `Config::param_source` says parameters come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterSource {
    Env,
    File,
}

impl ParameterSource {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "env" => Ok(ParameterSource::Env),
            "file" => Ok(ParameterSource::File),
            other => Err(TradeError::invalid_parameter(
                "PARAM_SOURCE",
                format!("unknown parameter source {:?}", other),
            )),
        }
    }

    pub fn build(self, cfg: &Config) -> Box<dyn ParameterStore> {
        match self {
            ParameterSource::Env => Box::new(EnvParameterStore),
            ParameterSource::File => Box::new(FileParameterStore::new(&cfg.param_file)),
        }
    }
}

/// Environment variable holding parameter `name`: `buy-btc-apikey` → `BUY_BTC_APIKEY`.
pub fn env_var_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '.' | '/' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Reads parameters from the process environment.
pub struct EnvParameterStore;

#[async_trait]
impl ParameterStore for EnvParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let var = env_var_name(name);
        std::env::var(&var).map_err(|_| TradeError::MissingParameter(name.to_string()))
    }
}

/// Reads parameters from a JSON object file, re-read on every lookup.
pub struct FileParameterStore {
    path: PathBuf,
}

impl FileParameterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ParameterStore for FileParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TradeError::ParameterStore(format!("{}: {}", self.path.display(), e))
        })?;
        let params: HashMap<String, String> = serde_json::from_str(&raw)?;
        params
            .get(name)
            .cloned()
            .ok_or_else(|| TradeError::MissingParameter(name.to_string()))
    }
}

/// Fixed in-memory parameters.
#[derive(Default, Clone)]
pub struct StaticParameterStore {
    params: HashMap<String, String>,
}

impl StaticParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl ParameterStore for StaticParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        self.params
            .get(name)
            .cloned()
            .ok_or_else(|| TradeError::MissingParameter(name.to_string()))
    }
}

/// Names of the three parameters one invocation needs.
#[derive(Debug, Clone)]
pub struct ParameterNames {
    pub api_key: String,
    pub api_secret: String,
    pub budget: String,
}

impl ParameterNames {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_key: cfg.param_api_key.clone(),
            api_secret: cfg.param_api_secret.clone(),
            budget: cfg.param_budget.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Secrets {
    pub api_key: String,
    pub api_secret: String,
    /// Quote currency spent per invocation.
    pub budget: f64,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("budget", &self.budget)
            .finish()
    }
}

async fn fetch_non_empty(store: &dyn ParameterStore, name: &str) -> Result<String> {
    let value = store.get_parameter(name).await?;
    let value = value.trim();
    if value.is_empty() {
        return Err(TradeError::invalid_parameter(name, "empty value"));
    }
    Ok(value.to_string())
}

impl Secrets {
    pub async fn load(store: &dyn ParameterStore, names: &ParameterNames) -> Result<Self> {
        let api_key = fetch_non_empty(store, &names.api_key).await?;
        let api_secret = fetch_non_empty(store, &names.api_secret).await?;
        let budget_raw = fetch_non_empty(store, &names.budget).await?;
        let budget: f64 = budget_raw.parse().map_err(|_| {
            TradeError::invalid_parameter(&names.budget, format!("not a number: {:?}", budget_raw))
        })?;

        log(
            Level::Debug,
            Domain::Secrets,
            "loaded",
            obj(&[
                ("key_param", v_str(&names.api_key)),
                ("secret_param", v_str(&names.api_secret)),
                ("budget", v_str(&budget_raw)),
            ]),
        );

        Ok(Self {
            api_key,
            api_secret,
            budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names() -> ParameterNames {
        ParameterNames::from_config(&Config::default())
    }

    fn full_store() -> StaticParameterStore {
        StaticParameterStore::new()
            .with("buy-btc-apikey", "key-123")
            .with("buy-btc-apisecret", "secret-456")
            .with("buy-btc-oneshotbuybudget", " 500 ")
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("buy-btc-apikey"), "BUY_BTC_APIKEY");
        assert_eq!(env_var_name("/prod/buy-btc.budget"), "PROD_BUY_BTC_BUDGET");
    }

    #[test]
    fn test_source_from_name() {
        assert_eq!(ParameterSource::from_name("ENV").unwrap(), ParameterSource::Env);
        assert_eq!(ParameterSource::from_name("file").unwrap(), ParameterSource::File);
        assert!(ParameterSource::from_name("vault").is_err());
    }

    #[tokio::test]
    async fn test_load_all_three() {
        let secrets = Secrets::load(&full_store(), &names()).await.unwrap();
        assert_eq!(secrets.api_key, "key-123");
        assert_eq!(secrets.api_secret, "secret-456");
        assert_eq!(secrets.budget, 500.0);
    }

    #[tokio::test]
    async fn test_missing_parameter_named() {
        let store = StaticParameterStore::new().with("buy-btc-apikey", "k");
        let err = Secrets::load(&store, &names()).await.unwrap_err();
        assert_eq!(err.to_string(), "parameter not found: buy-btc-apisecret");
    }

    #[tokio::test]
    async fn test_bad_budget() {
        let store = full_store().with("buy-btc-oneshotbuybudget", "five hundred");
        let err = Secrets::load(&store, &names()).await.unwrap_err();
        assert!(matches!(err, TradeError::InvalidParameter { ref name, .. } if name == "buy-btc-oneshotbuybudget"));

        let store = full_store().with("buy-btc-apisecret", "   ");
        let err = Secrets::load(&store, &names()).await.unwrap_err();
        assert!(matches!(err, TradeError::InvalidParameter { .. }));
    }

    #[test]
    fn test_debug_redacts() {
        let secrets = Secrets {
            api_key: "key-123".to_string(),
            api_secret: "secret-456".to_string(),
            budget: 500.0,
        };
        let dbg = format!("{:?}", secrets);
        assert!(!dbg.contains("key-123"));
        assert!(!dbg.contains("secret-456"));
        assert!(dbg.contains("500"));
    }

    #[tokio::test]
    async fn test_file_store_rereads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"buy-btc-oneshotbuybudget":"500"}}"#).unwrap();
        file.flush().unwrap();

        let store = FileParameterStore::new(file.path());
        assert_eq!(store.get_parameter("buy-btc-oneshotbuybudget").await.unwrap(), "500");
        assert!(matches!(
            store.get_parameter("buy-btc-apikey").await,
            Err(TradeError::MissingParameter(_))
        ));

        std::fs::write(file.path(), r#"{"buy-btc-oneshotbuybudget":"750"}"#).unwrap();
        assert_eq!(store.get_parameter("buy-btc-oneshotbuybudget").await.unwrap(), "750");
    }

    #[tokio::test]
    async fn test_file_store_missing_file() {
        let store = FileParameterStore::new("/nonexistent/parameters.json");
        let err = store.get_parameter("buy-btc-apikey").await.unwrap_err();
        assert!(matches!(err, TradeError::ParameterStore(_)));
    }
}
