//! Line-oriented rendering surface for the conversion form.
//!
//! Each input line is one submitted field (`USD 12.50`) or a command. Rate
//! refreshes run in the background; edits made meanwhile use the rates that
//! were installed before the refresh started.

use super::ui;
use crate::core::{
    ConversionError, ConversionForm, FetchError, FetchOutcome, FetchTicket, RateProvider,
    RateTable,
};
use anyhow::{Context, Result};
use chrono::Local;
use comfy_table::Cell;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const HELP: &str = "Enter `<CODE> <amount>` to update a field (e.g. `USD 12.50`).
Commands: `refresh` fetches new rates, `help` shows this text, `quit` exits.";

#[derive(Debug, PartialEq, Eq)]
pub enum FormCommand {
    Edit { code: String, text: String },
    Refresh,
    Help,
    Quit,
    Nothing,
}

pub fn parse_command(line: &str) -> FormCommand {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => FormCommand::Nothing,
        "refresh" => FormCommand::Refresh,
        "help" | "?" => FormCommand::Help,
        "quit" | "exit" | "q" => FormCommand::Quit,
        _ => {
            let (code, text) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            FormCommand::Edit {
                code: code.to_uppercase(),
                text: text.trim().to_string(),
            }
        }
    }
}

/// Renders the header, the field table and the rate status line.
pub fn render_form(form: &ConversionForm) -> String {
    let mut output = String::new();

    if let Some(identity) = form.identity() {
        output.push_str(&format!(
            "Signed in as {}",
            ui::style_text(&identity.display_name, ui::StyleType::Title)
        ));
        if let Some(avatar) = &identity.avatar_uri {
            output.push_str(&format!(" {}", ui::style_text(avatar, ui::StyleType::Subtle)));
        }
        output.push_str("\n\n");
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Amount")]);
    for field in form.fields() {
        table.add_row(vec![Cell::new(field.display_name), ui::amount_cell(field.text)]);
    }
    output.push_str(&table.to_string());
    output.push('\n');

    let status = match form.rates() {
        Some(rates) => rates_status(&rates),
        None => ui::style_text("Exchange rates not loaded", ui::StyleType::Error),
    };
    output.push_str(&status);

    output
}

fn rates_status(rates: &RateTable) -> String {
    let mut status = format!(
        "Rates against {} updated {}",
        ui::style_text(rates.base(), ui::StyleType::Label),
        rates.fetched_at().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(published) = rates.published_at() {
        status.push_str(&ui::style_text(
            &format!(" (published {})", published.format("%Y-%m-%d %H:%M UTC")),
            ui::StyleType::Subtle,
        ));
    }
    status
}

/// Prints a user-facing notice for a finished fetch.
pub fn report_fetch<W: Write>(outcome: &FetchOutcome, out: &mut W) -> Result<()> {
    if let FetchOutcome::Failed(err) = outcome {
        writeln!(
            out,
            "{}",
            ui::style_text(
                &format!("Could not fetch exchange rates: {err}"),
                ui::StyleType::Error
            )
        )?;
    }
    Ok(())
}

fn report_edit<W: Write>(code: &str, err: &ConversionError, out: &mut W) -> Result<()> {
    let notice = match err {
        ConversionError::MissingRate(_) => ui::style_text(
            &format!("Rates not loaded yet, {code} was not converted"),
            ui::StyleType::Subtle,
        ),
        _ => ui::style_text(&err.to_string(), ui::StyleType::Error),
    };
    writeln!(out, "{notice}")?;
    Ok(())
}

type FetchResult = (FetchTicket, Result<RateTable, FetchError>);

fn spawn_fetch(
    provider: &Arc<dyn RateProvider>,
    base: &str,
    ticket: FetchTicket,
    tx: &mpsc::UnboundedSender<FetchResult>,
) -> JoinHandle<()> {
    let provider = Arc::clone(provider);
    let base = base.to_string();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = provider.fetch_rates(&base).await;
        // The receiver only goes away when the form has exited.
        let _ = tx.send((ticket, result));
    })
}

/// Fetches rates once, then processes input lines until `quit` or end of input.
pub async fn run<R, W>(
    form: &mut ConversionForm,
    provider: Arc<dyn RateProvider>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let ticket = form.begin_fetch();
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let result = provider.fetch_rates(form.base()).await;
    spinner.finish_and_clear();
    report_fetch(&form.complete_fetch(ticket, result), out)?;
    writeln!(out, "{}\n{}", render_form(form), ui::style_text(HELP, ui::StyleType::Subtle))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<FetchResult>();
    let mut in_flight: Option<JoinHandle<()>> = None;
    let mut lines = input.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_command(&line) {
                    FormCommand::Edit { code, text } => {
                        match form.edit(&code, &text) {
                            Ok(()) => writeln!(out, "{}", render_form(form))?,
                            Err(err) => report_edit(&code, &err, out)?,
                        }
                    }
                    FormCommand::Refresh => {
                        if let Some(previous) = in_flight.take() {
                            debug!("Abandoning in-flight rate fetch");
                            previous.abort();
                        }
                        let ticket = form.begin_fetch();
                        in_flight = Some(spawn_fetch(&provider, form.base(), ticket, &tx));
                        writeln!(out, "{}", ui::style_text("Refreshing rates...", ui::StyleType::Subtle))?;
                    }
                    FormCommand::Help => writeln!(out, "{HELP}")?,
                    FormCommand::Quit => break,
                    FormCommand::Nothing => {}
                }
            }
            Some((ticket, result)) = rx.recv() => {
                let outcome = form.complete_fetch(ticket, result);
                report_fetch(&outcome, out)?;
                if outcome == FetchOutcome::Installed {
                    writeln!(out, "{}", render_form(form))?;
                }
            }
        }
    }

    if let Some(pending) = in_flight {
        pending.abort();
    }
    Ok(())
}
