use crate::report::{run_cases_export, run_cases_report, ExportArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use onbid::auction::TierBasis;
use onbid::config::DashboardConfig;
use onbid::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Onbid Case Dashboard",
    about = "Serve and query the public-auction case dashboard from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or download the filtered case table
    Cases {
        #[command(subcommand)]
        command: CasesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CasesCommand {
    /// Print KPIs, chart series and the sorted case table
    Report(ReportArgs),
    /// Write the filtered case table to a UTF-8 (BOM) CSV file
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

/// Overrides for where case data is read from.
#[derive(Args, Debug, Default)]
pub(crate) struct DataArgs {
    /// Candidate case CSV files, first existing wins (repeatable)
    #[arg(long = "data")]
    pub(crate) data_paths: Vec<PathBuf>,
    /// Auction listings CSV to link cases against
    #[arg(long)]
    pub(crate) listings: Option<PathBuf>,
    /// Value the A/B/C tiers are cut on: score or amount
    #[arg(long)]
    pub(crate) tier_basis: Option<TierBasis>,
}

impl DataArgs {
    pub(crate) fn apply(&mut self, config: &mut DashboardConfig) {
        if !self.data_paths.is_empty() {
            config.data_paths = std::mem::take(&mut self.data_paths);
        }
        if let Some(listings) = self.listings.take() {
            config.listings_path = Some(listings);
        }
        if let Some(basis) = self.tier_basis.take() {
            config.tier_basis = basis;
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Cases {
            command: CasesCommand::Report(args),
        } => run_cases_report(args),
        Command::Cases {
            command: CasesCommand::Export(args),
        } => run_cases_export(args),
    }
}
