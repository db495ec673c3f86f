//! Core business logic: rates, conversion and the form state

pub mod config;
pub mod currency;
pub mod engine;
pub mod error;
pub mod form;
pub mod identity;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use currency::{Currency, RateProvider};
pub use engine::{AmountState, EditEvent, apply_edit};
pub use error::{ConversionError, FetchError};
pub use form::{ConversionForm, FetchOutcome, FetchTicket, ScreenState};
pub use identity::Identity;
pub use rates::RateTable;
