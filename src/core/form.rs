//! The conversion form: committed amounts, per-field edit buffers and the
//! current rate snapshot.
//!
//! Rate fetches are identified by a monotonically increasing generation. Only
//! the most recently requested fetch may install its table; results of older
//! fetches are discarded, and failures leave the current snapshot in place.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::currency::Currency;
use super::engine::{self, AmountState, EditEvent};
use super::error::{ConversionError, FetchError};
use super::identity::Identity;
use super::rates::RateTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    /// No rate table yet; edits stay in their field buffer.
    RatesUnloaded,
    RatesLoaded,
}

/// Handle for an in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Installed,
    Failed(FetchError),
    /// A newer fetch was requested after this one.
    Discarded,
}

/// One rendered field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView<'a> {
    pub code: &'a str,
    pub display_name: &'a str,
    pub text: &'a str,
}

pub struct ConversionForm {
    currencies: Vec<Currency>,
    base: String,
    committed: AmountState,
    buffers: HashMap<String, String>,
    rates: Option<Arc<RateTable>>,
    latest_generation: u64,
    identity: Option<Identity>,
}

impl ConversionForm {
    pub fn new(currencies: Vec<Currency>, base: &str) -> Self {
        let committed = AmountState::new(&currencies);
        let buffers = currencies
            .iter()
            .map(|c| (c.code.clone(), String::new()))
            .collect();

        ConversionForm {
            currencies,
            base: base.to_uppercase(),
            committed,
            buffers,
            rates: None,
            latest_generation: 0,
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn amounts(&self) -> &AmountState {
        &self.committed
    }

    pub fn screen_state(&self) -> ScreenState {
        if self.rates.is_some() {
            ScreenState::RatesLoaded
        } else {
            ScreenState::RatesUnloaded
        }
    }

    /// Snapshot of the installed rate table.
    pub fn rates(&self) -> Option<Arc<RateTable>> {
        self.rates.clone()
    }

    /// Starts a new fetch generation, superseding any fetch still in flight.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_generation += 1;
        let ticket = FetchTicket(self.latest_generation);
        debug!(generation = ticket.generation(), "Rate fetch started");
        ticket
    }

    /// Records the result of the fetch identified by `ticket`.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<RateTable, FetchError>,
    ) -> FetchOutcome {
        if ticket.generation() < self.latest_generation {
            debug!(
                generation = ticket.generation(),
                latest = self.latest_generation,
                "Discarding superseded rate fetch"
            );
            return FetchOutcome::Discarded;
        }

        match result.and_then(|table| table.ensure_covers(&self.currencies).map(|_| table)) {
            Ok(table) => {
                info!(
                    generation = ticket.generation(),
                    base = table.base(),
                    rates = table.len(),
                    "Installed rate table"
                );
                self.rates = Some(Arc::new(table));
                FetchOutcome::Installed
            }
            Err(err) => {
                warn!(generation = ticket.generation(), error = %err, "Rate fetch failed, keeping previous rates");
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Replaces the edit buffer of `code` without recomputing anything.
    pub fn type_text(&mut self, code: &str, text: &str) -> Result<(), ConversionError> {
        let code = code.to_uppercase();
        let buffer = self
            .buffers
            .get_mut(&code)
            .ok_or(ConversionError::UnknownCurrency(code))?;
        *buffer = text.to_string();
        Ok(())
    }

    /// Reconciles the buffer of `code` with the committed amounts.
    ///
    /// On success every field shows the recomputed amounts. On failure the
    /// committed amounts are untouched and the field keeps its typed text.
    pub fn submit(&mut self, code: &str) -> Result<(), ConversionError> {
        let code = code.to_uppercase();
        let raw = self
            .buffers
            .get(&code)
            .ok_or_else(|| ConversionError::UnknownCurrency(code.clone()))?;
        let event = EditEvent::new(&code, raw);

        let rates = self
            .rates
            .clone()
            .ok_or_else(|| ConversionError::MissingRate(code.clone()))?;

        match engine::apply_edit(&self.committed, &rates, &event) {
            Ok(next) => {
                self.committed = next;
                for (code, buffer) in self.buffers.iter_mut() {
                    *buffer = self.committed.get(code).unwrap_or_default().to_string();
                }
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "Dropping edit");
                Err(err)
            }
        }
    }

    /// Types `raw` into the field of `code` and submits it.
    pub fn edit(&mut self, code: &str, raw: &str) -> Result<(), ConversionError> {
        self.type_text(code, raw)?;
        self.submit(code)
    }

    /// Fields in configured order, showing each field's current buffer.
    pub fn fields(&self) -> Vec<FieldView<'_>> {
        self.currencies
            .iter()
            .map(|c| FieldView {
                code: &c.code,
                display_name: &c.display_name,
                text: self.buffers.get(&c.code).map_or("", String::as_str),
            })
            .collect()
    }
}
