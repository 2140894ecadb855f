mod cli;
mod commands;
mod formatting;
mod pipeline;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_compare, run_metrics, run_stats, CompareArgs, StatsArgs};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Compare {
            kind,
            entity1,
            entity2,
            scope1,
            scope2,
            metrics,
            api_url,
            format,
            output,
        } => {
            run_compare(
                args.config,
                args.verbose,
                CompareArgs {
                    kind,
                    entity1,
                    entity2,
                    scope1,
                    scope2,
                    metrics,
                    api_url,
                    format,
                    output,
                },
            )
            .await
        }
        Commands::Stats {
            kind,
            entity,
            scope,
            api_url,
            format,
            output,
        } => {
            run_stats(
                args.config,
                args.verbose,
                StatsArgs {
                    kind,
                    entity,
                    scope,
                    api_url,
                    format,
                    output,
                },
            )
            .await
        }
        Commands::Metrics { format, output } => run_metrics(format, output),
    }
}

/// Logs go to stderr so stdout stays a single output document.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init();
}
