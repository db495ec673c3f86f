//! Immutable rate table snapshots

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::currency::Currency;
use super::error::FetchError;

/// Rates expressed as units of each currency per one unit of `base`.
///
/// A table is validated on construction and never mutated afterwards; a newer
/// fetch replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: HashMap<String, f64>,
    fetched_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl RateTable {
    /// Builds a table, rejecting an empty rate map and any rate that is not a
    /// finite positive number.
    pub fn new(
        base: &str,
        rates: HashMap<String, f64>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        let mut normalized = HashMap::with_capacity(rates.len());
        for (code, rate) in rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(FetchError::Parse(format!(
                    "rate for {code} is not a positive number: {rate}"
                )));
            }
            normalized.insert(code.to_uppercase(), rate);
        }

        let table = RateTable {
            base: base.to_uppercase(),
            rates: normalized,
            fetched_at,
            published_at: None,
        };
        if table.is_empty() {
            return Err(FetchError::Parse(format!(
                "response has no rates for base {}",
                table.base
            )));
        }
        Ok(table)
    }

    /// Attaches the time the rate service says it last updated its rates.
    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Rate for `code`. The base currency is always present with rate 1.0.
    pub fn rate(&self, code: &str) -> Option<f64> {
        match self.rates.get(code) {
            Some(rate) => Some(*rate),
            None if code == self.base => Some(1.0),
            None => None,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Fails if any tracked currency lacks a rate.
    pub fn ensure_covers(&self, currencies: &[Currency]) -> Result<(), FetchError> {
        let missing: Vec<&str> = currencies
            .iter()
            .filter(|c| self.rate(&c.code).is_none())
            .map(|c| c.code.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FetchError::Parse(format!(
                "response has no rate for {}",
                missing.join(", ")
            )))
        }
    }
}
