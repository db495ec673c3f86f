use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

use super::currency::Currency;
use super::identity::Identity;

pub const DEFAULT_RATE_SERVICE_URL: &str = "https://api.exchangerate-api.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ExchangeRateProviderConfig {
    fn default() -> Self {
        ExchangeRateProviderConfig {
            base_url: DEFAULT_RATE_SERVICE_URL.to_string(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub exchangerate: ExchangeRateProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: String,
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub user: Option<Identity>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: "BRL".to_string(),
            currencies: vec![
                Currency::new("BRL", "Real (BRL)"),
                Currency::new("USD", "Dólar (USD)"),
                Currency::new("EUR", "Euro (EUR)"),
                Currency::new("GBP", "Libra (GBP)"),
            ],
            providers: ProvidersConfig::default(),
            user: None,
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, or built-in defaults when there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "fxform")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        let config = config
            .normalized()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Upper-cases currency codes and rejects empty or duplicate entries.
    pub fn normalized(mut self) -> Result<Self> {
        self.base_currency = self.base_currency.trim().to_uppercase();
        if self.base_currency.is_empty() {
            bail!("base_currency must not be empty");
        }
        if self.currencies.is_empty() {
            bail!("At least one currency must be configured");
        }

        let mut seen = HashSet::new();
        for currency in &mut self.currencies {
            currency.code = currency.code.trim().to_uppercase();
            if currency.code.is_empty() {
                bail!("Currency codes must not be empty");
            }
            if !seen.insert(currency.code.clone()) {
                bail!("Duplicate currency: {}", currency.code);
            }
        }
        Ok(self)
    }
}
