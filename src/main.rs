use anyhow::Result;
use clap::{Parser, Subcommand};
use fxform::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxform::AppCommand {
    fn from(cmd: Commands) -> fxform::AppCommand {
        match cmd {
            Commands::Form => fxform::AppCommand::Form,
            Commands::Convert { currency, amount } => {
                fxform::AppCommand::Convert { currency, amount }
            }
            Commands::Rates => fxform::AppCommand::Rates,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Open the interactive conversion form (default)
    Form,
    /// Convert a single amount into every configured currency
    Convert {
        /// Currency code of the amount, e.g. USD
        currency: String,
        /// Amount to convert
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Display the current exchange rates
    Rates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxform::cli::setup::setup(),
        Some(cmd) => fxform::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => fxform::run_command(fxform::AppCommand::Form, cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
