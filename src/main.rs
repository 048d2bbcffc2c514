use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smartapi_credit::cli::{Cli, Command, VerbosityLevel};
use smartapi_credit::config::{Config, ConfigManager};
use smartapi_credit::output::{Output, format_duration};
use smartapi_credit::poller::{AbortSignal, Poller};
use smartapi_credit::request::{RequestContext, RequestKind};
use smartapi_credit::resolver::{ReportDocument, ResponseResolver};
use smartapi_credit::{SmartApiClient, serializer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;

    let verbosity = verbosity(&config);
    init_tracing(&config, verbosity);

    let output = Output::new(verbosity, config.output.format);

    match &cli.command {
        Command::Render { request, kind } => render(request, *kind).await,
        Command::Inspect { response } => inspect(response, &output).await,
        Command::Order {
            request,
            save_report,
        } => order(&config, &output, request, save_report.as_deref()).await,
    }
}

fn verbosity(config: &Config) -> VerbosityLevel {
    if config.output.quiet {
        VerbosityLevel::Quiet
    } else if config.output.verbose {
        VerbosityLevel::Verbose
    } else {
        VerbosityLevel::Normal
    }
}

/// `RUST_LOG` wins; otherwise the configured level, adjusted by -v/-q
fn init_tracing(config: &Config, verbosity: VerbosityLevel) {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "warn",
        VerbosityLevel::Normal => config.output.log_level.as_str(),
        VerbosityLevel::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn render(path: &Path, kind: Option<RequestKind>) -> Result<()> {
    let mut ctx = RequestContext::from_file(path)
        .await
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    if let Some(kind) = kind {
        ctx.set_kind(kind);
    }

    let document = serializer::serialize(&ctx)?;
    println!("{}", document);
    Ok(())
}

async fn inspect(path: &Path, output: &Output) -> Result<()> {
    let xml = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read response {}", path.display()))?;
    let resolver = ResponseResolver::load(&xml)?;

    print!("{}", output.format_summary(&resolver.summary()?)?);
    Ok(())
}

async fn order(
    config: &Config,
    output: &Output,
    path: &Path,
    save_report: Option<&Path>,
) -> Result<()> {
    let ctx = RequestContext::from_file(path)
        .await
        .with_context(|| format!("Failed to read request {}", path.display()))?;

    let client = SmartApiClient::new(config.credentials()?, config.http_client_config())?;
    let abort = Arc::new(AbortSignal::new());
    let poller = Poller::from_config(client, &config.polling).with_abort_signal(Arc::clone(&abort));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            abort.raise();
        }
    });

    let start = Instant::now();
    let outcome = poller.run(&ctx).await?;
    info!(
        status_queries = outcome.status_queries,
        elapsed = %format_duration(start.elapsed()),
        "Order finished"
    );

    print!("{}", output.format_summary(&outcome.resolver.summary()?)?);

    if let Some(target) = save_report {
        let document = match outcome.resolver.report_document("application/pdf")? {
            Some(pdf) => Some(pdf),
            None => outcome.resolver.report_document("text/html")?,
        }
        .context("Response carries no PDF or HTML report")?;
        save_document(&document, target).await?;
    }

    Ok(())
}

async fn save_document(document: &ReportDocument, target: &Path) -> Result<()> {
    let bytes = document.content_bytes()?;
    tokio::fs::write(target, &bytes)
        .await
        .with_context(|| format!("Failed to write report to {}", target.display()))?;
    info!(
        path = %target.display(),
        mime_type = %document.mime_type,
        bytes = bytes.len(),
        "Saved embedded report"
    );
    Ok(())
}
