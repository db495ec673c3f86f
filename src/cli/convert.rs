//! One-shot commands: convert a single amount, or list the current rates.

use super::form::render_form;
use super::ui;
use crate::core::engine;
use crate::core::{ConversionForm, FetchOutcome, RateProvider};
use anyhow::{Result, anyhow};
use comfy_table::{Cell, CellAlignment};
use std::io::Write;
use tracing::info;

async fn load_rates(form: &mut ConversionForm, provider: &dyn RateProvider) -> Result<()> {
    let ticket = form.begin_fetch();
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let result = provider.fetch_rates(form.base()).await;
    spinner.finish_and_clear();

    match form.complete_fetch(ticket, result) {
        FetchOutcome::Failed(err) => Err(anyhow!("Could not fetch exchange rates: {err}")),
        _ => Ok(()),
    }
}

/// Enters `amount` into the field of `code` and prints the resulting form.
pub async fn run<W: Write>(
    form: &mut ConversionForm,
    provider: &dyn RateProvider,
    code: &str,
    amount: &str,
    out: &mut W,
) -> Result<()> {
    load_rates(form, provider).await?;

    info!(%code, %amount, "Converting");
    form.edit(code, amount)?;
    writeln!(out, "{}", render_form(form))?;
    Ok(())
}

/// Prints the rate of every tracked currency against the base currency.
pub async fn run_rates<W: Write>(
    form: &mut ConversionForm,
    provider: &dyn RateProvider,
    out: &mut W,
) -> Result<()> {
    load_rates(form, provider).await?;
    let rates = form
        .rates()
        .ok_or_else(|| anyhow!("No exchange rates installed"))?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Per 1 {}", rates.base())),
        ui::header_cell(&format!("In {}", rates.base())),
    ]);
    for currency in form.currencies() {
        if rates.rate(&currency.code).is_none() {
            continue;
        }
        let per_base = engine::convert(1.0, rates.base(), &currency.code, &rates)?;
        let in_base = engine::convert(1.0, &currency.code, rates.base(), &rates)?;
        table.add_row(vec![
            Cell::new(&currency.display_name),
            Cell::new(format!("{per_base:.4}")).set_alignment(CellAlignment::Right),
            Cell::new(format!("{in_base:.4}")).set_alignment(CellAlignment::Right),
        ]);
    }

    writeln!(out, "{table}")?;
    Ok(())
}
