use anyhow::{Context, Result};
use clap::Parser;
use headliner::api::{Category, Language, NewsApiClient, SourcesParams};
use headliner::refresher::{ErrorKind, RefreshError, RefreshEvent, Refresher};
use headliner::settings::{Settings, API_KEY_ENV};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Get the config directory path (~/.config/headliner/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("headliner"))
}

#[derive(Parser, Debug)]
#[command(
    name = "headliner",
    about = "Poll NewsAPI for articles from a fixed set of sources, within a daily request budget"
)]
struct Args {
    /// Settings file (default: ~/.config/headliner/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Source id to poll; repeat for several. Replaces refresher.source_ids.
    #[arg(long = "source", value_name = "ID")]
    sources: Vec<String>,

    /// Requests this run may spend. Replaces refresher.remaining_requests.
    #[arg(long, value_name = "N")]
    budget: Option<i64>,

    /// First page to request. Replaces refresher.start_page.
    #[arg(long, value_name = "N")]
    start_page: Option<i64>,

    /// Print the available sources as JSON lines and exit
    #[arg(long)]
    list_sources: bool,

    /// Filter for --list-sources
    #[arg(long, requires = "list_sources")]
    category: Option<Category>,

    /// Filter for --list-sources
    #[arg(long, requires = "list_sources")]
    language: Option<Language>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON lines only.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut settings = Settings::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    let api_key = settings.api.api_key().with_context(|| {
        format!(
            "No NewsAPI key: set {} or api.api_key in {}",
            API_KEY_ENV,
            config_path.display()
        )
    })?;

    let http = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(settings.api.timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let client = NewsApiClient::new(http, &settings.api.base_url, api_key)
        .context("Failed to create NewsAPI client")?
        .with_timeout(settings.api.timeout());

    if args.list_sources {
        let params = SourcesParams {
            category: args.category,
            language: args.language,
            country: None,
        };
        return list_sources(&client, &params).await;
    }

    if !args.sources.is_empty() {
        settings.refresher.source_ids = args.sources;
    }
    if let Some(budget) = args.budget {
        settings.refresher.remaining_requests = budget;
    }
    if let Some(start_page) = args.start_page {
        settings.refresher.start_page = start_page;
    }

    let mut handle = Refresher::new(client).spawn(settings.refresher);

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping refresher");
            cancel.cancel();
        }
    });

    let mut config_error: Option<RefreshError> = None;
    let mut spent = 0u64;
    while let Some(event) = handle.streams.recv().await {
        match event {
            RefreshEvent::Articles(articles) => {
                let mut stdout = std::io::stdout().lock();
                for article in &articles {
                    let line = serde_json::to_string(article).context("Failed to encode article")?;
                    writeln!(stdout, "{line}").context("Failed to write to stdout")?;
                }
                stdout.flush().context("Failed to write to stdout")?;
            }
            RefreshEvent::Tick(n) => {
                spent += u64::from(n);
                tracing::debug!(spent, "Request spent");
            }
            RefreshEvent::Error(e) if e.kind() == ErrorKind::Configuration => {
                config_error = Some(e);
            }
            RefreshEvent::Error(e) => {
                if let Some(api) = e.fetch_error().and_then(|f| f.api_error()) {
                    if api.is_quota_exceeded() || api.is_auth_error() {
                        tracing::error!(code = %api.code, error = %e, "NewsAPI refused the request");
                        continue;
                    }
                }
                tracing::warn!(error = %e, "Refresh error");
            }
        }
    }

    let summary = handle.join().await.context("Refresher task failed")?;

    if let Some(e) = config_error {
        return Err(e).with_context(|| {
            format!("Refresher did not start (settings: {})", config_path.display())
        });
    }

    tracing::info!(
        stop = %summary.stop,
        requests = summary.requests,
        succeeded = summary.succeeded,
        failed = summary.failed,
        articles = summary.articles,
        passes = summary.passes,
        next_page = ?summary.page,
        "Run finished"
    );
    Ok(())
}

async fn list_sources(client: &NewsApiClient, params: &SourcesParams) -> Result<()> {
    let response = client
        .fetch_sources(params)
        .await
        .context("Failed to fetch sources")?;

    let mut stdout = std::io::stdout().lock();
    for source in &response.sources {
        let line = serde_json::to_string(source).context("Failed to encode source")?;
        writeln!(stdout, "{line}").context("Failed to write to stdout")?;
    }
    stdout.flush().context("Failed to write to stdout")?;

    tracing::info!(count = response.sources.len(), "Listed sources");
    Ok(())
}
