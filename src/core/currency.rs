//! Currency definitions and the rate provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::FetchError;
use super::rates::RateTable;

/// A tracked currency as shown on the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code, e.g. `BRL`.
    pub code: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl Currency {
    pub fn new(code: &str, display_name: &str) -> Self {
        Currency {
            code: code.to_uppercase(),
            display_name: display_name.to_string(),
        }
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches a full rate table quoted against `base`.
    async fn fetch_rates(&self, base: &str) -> Result<RateTable, FetchError>;
}
