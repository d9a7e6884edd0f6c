//! CLI entry point for the update fetcher.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use update_downloader::{
    CompletionOutcome, DestinationResolver, DownloadDescriptor, DownloadEvent, DownloadSession,
    SessionConfig,
};
use url::Url;

mod cli;
mod progress;

use cli::Args;
use progress::TransferBar;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let source =
        Url::parse(&args.url).with_context(|| format!("invalid package URL: {}", args.url))?;

    let resolved = if args.no_resolve {
        None
    } else {
        let resolver = DestinationResolver::new(&config)?;
        let resolved = resolver.resolve_details(source.as_str()).await;
        if resolved.is_none() {
            debug!("preflight did not resolve a file name; falling back to the URL");
        }
        resolved
    };

    let destination = args.destination(
        &source,
        resolved.as_ref().map(|resolved| resolved.file_name.as_str()),
    );
    let label = destination
        .file_name()
        .map_or_else(|| args.url.clone(), |name| name.to_string_lossy().into_owned());
    info!(destination = %destination.display(), "Fetching package");

    let show_bar = progress::should_show_bar(
        io::stderr().is_terminal(),
        args.quiet,
        progress::is_dumb_terminal(),
    );
    let bar = TransferBar::new(
        show_bar,
        &label,
        resolved.as_ref().and_then(|resolved| resolved.content_length),
    );

    let mut session = DownloadSession::with_config(config);
    let mut events = session.start(DownloadDescriptor::new(
        source,
        destination.clone(),
        label.as_str(),
    ))?;

    let mut interrupted = false;
    let outcome = loop {
        tokio::select! {
            event = events.next_event() => match event {
                Some(DownloadEvent::Progress(snapshot)) => bar.update(&snapshot),
                Some(DownloadEvent::Completed { outcome, .. }) => break Some(outcome),
                None => break None,
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        warn!("Interrupt received; canceling download");
                        session.cancel();
                    }
                    Err(error) => debug!(error = %error, "interrupt handler unavailable"),
                }
            }
        }
    };

    match outcome {
        Some(CompletionOutcome::Succeeded) => {
            bar.finish("done");
            info!(path = %destination.display(), "Download complete");
            Ok(ExitCode::SUCCESS)
        }
        Some(CompletionOutcome::Canceled) => {
            bar.finish("canceled");
            warn!("Download canceled");
            Ok(ExitCode::from(130))
        }
        Some(CompletionOutcome::Failed { reason }) => {
            bar.finish("failed");
            error!(error = %reason, "Download failed");
            Ok(ExitCode::FAILURE)
        }
        None => {
            bar.finish("aborted");
            error!("Download ended without a result");
            Ok(ExitCode::FAILURE)
        }
    }
}
