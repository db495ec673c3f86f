pub mod cli;
pub mod core;
pub mod providers;

use crate::core::{ConversionForm, RateProvider, config::AppConfig};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Form,
    Convert { currency: String, amount: String },
    Rates,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxform starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider: Arc<dyn RateProvider> = Arc::new(
        providers::ExchangeRateApiProvider::from_config(&config.providers.exchangerate),
    );
    let mut form = ConversionForm::new(config.currencies, &config.base_currency)
        .with_identity(config.user);
    let mut stdout = std::io::stdout();

    match command {
        AppCommand::Form => {
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            cli::form::run(&mut form, provider, input, &mut stdout).await
        }
        AppCommand::Convert { currency, amount } => {
            cli::convert::run(
                &mut form,
                provider.as_ref(),
                &currency,
                &amount,
                &mut stdout,
            )
            .await
        }
        AppCommand::Rates => {
            cli::convert::run_rates(&mut form, provider.as_ref(), &mut stdout).await
        }
    }
}
