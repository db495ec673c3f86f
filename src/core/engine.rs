//! Conversion engine: recomputes every tracked amount from a single edit.
//!
//! The engine is pure. It reads an [`AmountState`] and a [`RateTable`] snapshot
//! and returns a new [`AmountState`]; callers install the result wholesale.
//!
//! Derived amounts are rounded to two decimals with ties going away from zero.
//! Rounding is applied to the shortest decimal representation of the converted
//! value, so `2.005` becomes `2.01` and `-2.005` becomes `-2.01`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::currency::Currency;
use super::error::ConversionError;
use super::rates::RateTable;

/// Authoritative display text of every tracked field. Empty means "no value yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountState {
    amounts: HashMap<String, String>,
}

impl AmountState {
    /// Creates a state with an empty entry for each tracked currency.
    pub fn new(currencies: &[Currency]) -> Self {
        AmountState {
            amounts: currencies
                .iter()
                .map(|c| (c.code.clone(), String::new()))
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.amounts.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.amounts.contains_key(code)
    }
}

/// A submitted edit of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub currency: String,
    pub raw_text: String,
}

impl EditEvent {
    pub fn new(currency: &str, raw_text: &str) -> Self {
        EditEvent {
            currency: currency.to_uppercase(),
            raw_text: raw_text.to_string(),
        }
    }
}

/// Keeps only ASCII digits, `.` and `-`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Reads the leading number of `text`, or 0 when there is none.
///
/// Only the longest prefix shaped like `-?digits(.digits)?` counts, so trailing
/// garbage such as a second `.` is ignored. Partial input (`"-"`, `"."`, `"-."`)
/// and values too large for `f64` yield 0.
pub fn parse_amount(text: &str) -> f64 {
    let bytes = text.as_bytes();
    let negative = bytes.first() == Some(&b'-');
    let int_start = usize::from(negative);

    let mut idx = int_start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let int_digits = &text[int_start..idx];

    let mut frac_digits = "";
    if idx < bytes.len() && bytes[idx] == b'.' {
        let frac_start = idx + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        frac_digits = &text[frac_start..end];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return 0.0;
    }

    let literal = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if int_digits.is_empty() { "0" } else { int_digits },
        if frac_digits.is_empty() { "0" } else { frac_digits },
    );
    literal
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Formats `value` with exactly two decimals, rounding half away from zero.
pub fn format_amount(value: f64) -> String {
    match value.to_string().parse::<Decimal>() {
        Ok(decimal) => {
            let mut rounded =
                decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            if rounded.is_zero() {
                // Drops the sign of negative zero.
                rounded = Decimal::ZERO;
            }
            rounded.rescale(2);
            rounded.to_string()
        }
        Err(_) => format!("{value:.2}"),
    }
}

/// Converts `amount` of `from` into `to` using the table's cross rate.
pub fn convert(
    amount: f64,
    from: &str,
    to: &str,
    rates: &RateTable,
) -> Result<f64, ConversionError> {
    let divisor = reference_rate(from, rates)?;
    let rate = rates
        .rate(to)
        .ok_or_else(|| ConversionError::MissingRate(to.to_string()))?;
    checked(amount * rate / divisor, to)
}

/// Applies `event` to `state` and returns the fully recomputed state.
///
/// The edited field keeps its sanitized text verbatim. Every other tracked
/// currency with a rate gets the converted amount; currencies without a rate
/// keep their previous text.
#[instrument(skip(state, rates, event), fields(currency = %event.currency))]
pub fn apply_edit(
    state: &AmountState,
    rates: &RateTable,
    event: &EditEvent,
) -> Result<AmountState, ConversionError> {
    let edited = event.currency.as_str();
    if !state.contains(edited) {
        return Err(ConversionError::UnknownCurrency(edited.to_string()));
    }
    let divisor = reference_rate(edited, rates)?;

    let sanitized = sanitize(&event.raw_text);
    let value = parse_amount(&sanitized);
    debug!(%sanitized, value, "Recomputing amounts");

    let mut amounts = state.amounts.clone();
    for (code, text) in amounts.iter_mut() {
        if code == edited {
            continue;
        }
        match rates.rate(code) {
            Some(rate) => *text = format_amount(checked(value * rate / divisor, code)?),
            None => debug!(currency = %code, "No rate, keeping previous amount"),
        }
    }
    amounts.insert(edited.to_string(), sanitized);

    Ok(AmountState { amounts })
}

fn reference_rate(code: &str, rates: &RateTable) -> Result<f64, ConversionError> {
    let rate = rates
        .rate(code)
        .ok_or_else(|| ConversionError::MissingRate(code.to_string()))?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ConversionError::InvalidRate {
            code: code.to_string(),
            rate,
        });
    }
    Ok(rate)
}

fn checked(converted: f64, code: &str) -> Result<f64, ConversionError> {
    if converted.is_finite() {
        Ok(converted)
    } else {
        Err(ConversionError::AmountOutOfRange(code.to_string()))
    }
}
