use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use btp_provider::cli::{Cli, Command};
use btp_provider::config::ProviderConfig;
use btp_provider::reconcile::Operation;
use btp_provider::resources;
use btp_provider::ui::{self, OperationProgress};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("warn,btp_provider={default_level}").into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ProviderConfig::load_from(path)?,
        None => ProviderConfig::load()?,
    };
    if let Some(secs) = cli.timeout_secs {
        config.reconcile.job_timeout_secs = secs;
        config.reconcile.sub_account_delete_timeout_secs = secs;
    }
    config.reconcile.validate()?;

    match &cli.command {
        Command::JobStatus { job_id } => {
            let state = resources::job_status(&config, job_id).await?;
            ui::print_job_state(job_id, &state);
            Ok(ExitCode::SUCCESS)
        }
        Command::Create { file } => apply(&config, Operation::Create, file, None).await,
        Command::Update { file, id } => {
            apply(&config, Operation::Update, file, id.as_deref()).await
        }
        Command::Delete { file, id } => {
            apply(&config, Operation::Delete, file, id.as_deref()).await
        }
    }
}

async fn apply(
    config: &ProviderConfig,
    operation: Operation,
    file: &Path,
    id: Option<&str>,
) -> Result<ExitCode> {
    let definition = resources::load_definition(file)
        .with_context(|| format!("failed to load {}", file.display()))?;

    let progress = OperationProgress::start(&format!("{operation} {}", definition.kind()));
    let result = resources::apply(&definition, operation, id, config).await;
    let code = progress.complete(&result);
    if let Ok(state) = &result {
        progress.print_report(&state.report);
    }
    Ok(code)
}
