//! Seeker command-line uploader.

mod config;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use seeker_notify::{UploadController, UploadOutcome};
use seeker_upload::{HttpUploadApi, UploadOptions, collect_upload_items, total_size};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::terminal::TerminalNotifier;

/// Upload files and directories to a Seeker server.
#[derive(Debug, Parser)]
#[command(name = "seeker-upload", version)]
struct Args {
    /// Files or directories to upload. Directories keep their structure.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Destination directory on the server.
    #[arg(short, long)]
    dest: Option<String>,

    /// API base URL, e.g. https://files.example.com/api.
    #[arg(long)]
    server: Option<String>,

    /// Bearer token.
    #[arg(long)]
    token: Option<String>,

    /// Timeout in seconds for init, chunk and cancel requests.
    #[arg(long)]
    timeout: Option<u64>,

    /// Chunk requests in flight per file.
    #[arg(long)]
    concurrency: Option<usize>,
}

impl Args {
    /// Applies command-line flags on top of the loaded configuration.
    fn apply(&self, config: &mut CliConfig) {
        if let Some(server) = &self.server {
            config.server_url = Some(server.clone());
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dest) = &self.dest {
            config.destination = dest.clone();
        }
    }

    fn options(&self) -> UploadOptions {
        let mut options = UploadOptions::default();
        if let Some(concurrency) = self.concurrency.filter(|c| *c > 0) {
            options.concurrency = concurrency;
        }
        options
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,seeker=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = CliConfig::load()?;
    args.apply(&mut config);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, config))
}

async fn run(args: Args, config: CliConfig) -> anyhow::Result<()> {
    let server_url = config
        .server_url
        .context("no server URL: pass --server, set SEEKER_URL or serverUrl in the config file")?;

    let mut builder = HttpUploadApi::builder(server_url).request_timeout(config.request_timeout);
    if let Some(token) = config.token {
        builder = builder.token(token);
    }
    let api = Arc::new(builder.build()?);

    let items = collect_upload_items(&args.paths)?;
    if items.is_empty() {
        println!("Nothing to upload");
        return Ok(());
    }
    tracing::info!(
        server = api.base_url(),
        destination = %config.destination,
        files = items.len(),
        total_bytes = total_size(&items),
        "starting upload"
    );

    let notifier = Arc::new(TerminalNotifier::new());
    let controller = UploadController::new(api, notifier.clone()).with_options(args.options());

    let interrupt = tokio::spawn({
        let notifier = Arc::clone(&notifier);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling upload");
                notifier.cancel_all();
            }
        }
    });

    let outcome = controller.upload(&config.destination, items).await;
    interrupt.abort();

    match outcome {
        UploadOutcome::Completed(batch) if batch.success => Ok(()),
        UploadOutcome::Completed(batch) => {
            for result in batch.results.iter().filter(|r| !r.success) {
                eprintln!(
                    "  {}: {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            anyhow::bail!("{} of {} files failed", batch.failed(), batch.results.len())
        }
        UploadOutcome::Cancelled => anyhow::bail!("upload cancelled"),
        UploadOutcome::Busy => anyhow::bail!("another upload is already running"),
        UploadOutcome::Failed(msg) => anyhow::bail!(msg),
    }
}
