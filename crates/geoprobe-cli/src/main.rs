//! Demonstration harness for geospatial REST requests.
//!
//! Builds one request from the command line, runs it through the executor
//! while printing its status events, then prints the response tree.

mod args;
mod report;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use geoprobe::{Executor, ROOT_LABEL, ResponseValue, ServiceClient, materialize};

use crate::args::{Cli, Command, TreeArgs};

#[tokio::main]
async fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = cli.service_config();

    match cli.command {
        Command::Fetch { path, params, tree } => {
            let client = ServiceClient::new(config).map_err(|e| e.to_string())?;
            let request = params
                .into_iter()
                .fold(client.json(path), |request, (k, v)| request.param(k, v));

            let (executor, status) = Executor::new();
            let printer = tokio::spawn(report::print_status(status));
            let outcome = executor.run(&request).await;
            drop(executor);
            let _ = printer.await;

            let root = outcome.into_result().map_err(|e| e.message)?;
            print!("{}", report::render_tree(root, tree));
        }
        Command::Image {
            path,
            params,
            output,
        } => {
            let client = ServiceClient::new(config).map_err(|e| e.to_string())?;
            let request = params
                .into_iter()
                .fold(client.binary(path), |request, (k, v)| request.param(k, v));

            let (executor, status) = Executor::new();
            let printer = tokio::spawn(report::print_status(status));
            let outcome = executor.run_binary(&request).await;
            drop(executor);
            let _ = printer.await;

            let bytes = outcome.into_result().map_err(|e| e.message)?;
            std::fs::write(&output, &bytes)
                .map_err(|e| format!("failed to write {}: {e}", output.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        Command::Inspect { file, tree } => inspect(&file, tree)?,
    }

    Ok(())
}

fn inspect(file: &Path, tree: TreeArgs) -> Result<(), String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let value: ResponseValue = serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse {}: {e}", file.display()))?;

    tracing::debug!(file = %file.display(), "inspecting saved response");
    print!("{}", report::render_tree(materialize(ROOT_LABEL, &value), tree));
    Ok(())
}
