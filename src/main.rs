mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_capture, CaptureArgs};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Capture {
            snapshot,
            selector,
            bgcolor,
            group,
            clean,
            fetch_timeout,
            format,
            output,
        } => {
            run_capture(
                args.config,
                CaptureArgs {
                    snapshot,
                    selector,
                    bgcolor,
                    group,
                    clean,
                    fetch_timeout,
                    format,
                    output,
                },
            )
            .await
        }
    }
}

/// `--verbose` forces debug logging; otherwise `RUST_LOG` decides, with
/// warnings as the default. Logs go to stderr so stdout stays JSON.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
