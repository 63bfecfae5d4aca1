use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use skinfolio::core::log::init_logging;

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

impl From<Commands> for skinfolio::AppCommand {
    fn from(cmd: Commands) -> skinfolio::AppCommand {
        match cmd {
            Commands::Add {
                name,
                unit_cost,
                quantity,
            } => skinfolio::AppCommand::Add {
                name,
                unit_cost,
                quantity,
            },
            Commands::Edit {
                id,
                name,
                unit_cost,
                quantity,
            } => skinfolio::AppCommand::Edit {
                id,
                name,
                unit_cost,
                quantity,
            },
            Commands::Remove { id } => skinfolio::AppCommand::Remove { id },
            Commands::SetPrice { id, price } => skinfolio::AppCommand::SetPrice { id, price },
            Commands::ClearPrice { id } => skinfolio::AppCommand::ClearPrice { id },
            Commands::Summary => skinfolio::AppCommand::Summary,
            Commands::History => skinfolio::AppCommand::History,
            Commands::Watch { interval } => skinfolio::AppCommand::Watch {
                interval_secs: interval,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Add a lot of identical items bought at one price
    Add {
        /// Market hash name, e.g. "Recoil Case"
        name: String,
        /// Price paid per item
        unit_cost: Decimal,
        /// Number of items
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Change the name, cost or quantity of a lot
    Edit {
        /// Lot id or a unique prefix of it
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "cost")]
        unit_cost: Option<Decimal>,
        #[arg(long)]
        quantity: Option<u32>,
    },
    /// Delete a lot
    Remove {
        /// Lot id or a unique prefix of it
        id: String,
    },
    /// Pin a lot to a manual price instead of the market price
    SetPrice {
        /// Lot id or a unique prefix of it
        id: String,
        price: Decimal,
    },
    /// Go back to the market price for a lot
    ClearPrice {
        /// Lot id or a unique prefix of it
        id: String,
    },
    /// Value every lot and display the portfolio
    Summary,
    /// Display the daily profit history
    History,
    /// Re-value the portfolio periodically
    Watch {
        /// Seconds between valuation passes
        #[arg(short, long, default_value_t = 300)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => skinfolio::cli::setup::setup_at_path(path),
            None => skinfolio::cli::setup::setup(),
        },
        Some(cmd) => skinfolio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
