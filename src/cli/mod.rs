pub mod convert;
pub mod form;
pub mod setup;
pub mod ui;
