mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "ltcg")]
#[command(about = "Capital gains report for Indian equity trades with grandfathering")]
struct Cli {
    /// Output format: table, markdown, json or csv
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Realize the trade log, value open holdings and print the report
    Report(commands::report::ReportArgs),
    /// Validate and realize the trade log without fetching any prices
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ltcg=info".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output)?;

    match &cli.command {
        Commands::Report(args) => commands::report::run(args, &format).await?,
        Commands::Check(args) => commands::check::run(args, &format)?,
    }

    Ok(())
}
