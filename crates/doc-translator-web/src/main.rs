//! Document Translator Web - HTTP service for translating Word documents.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use clap::Parser;
use doc_translator_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// How often finished jobs are checked for expiry.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Parser, Debug)]
#[command(name = "doc-translator-web")]
#[command(author, version, about = "Document Translator Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Configuration file (TOML)
    #[arg(short, long, env = "DOC_TRANSLATOR_CONFIG")]
    config: Option<PathBuf>,

    /// DeepL API key
    #[arg(long, env = "DEEPL_API_KEY")]
    deepl_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Default model for post-editing
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Clear post-edit cache on startup
    #[arg(long)]
    clear_cache: bool,
}

impl Args {
    /// Layered configuration with command-line values on top.
    fn app_config(&self) -> Result<AppConfig> {
        let mut config =
            AppConfig::load_layered(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(ref key) = self.deepl_api_key {
            config.deepl.api_key = Some(key.clone());
        }
        if let Some(ref base) = self.api_base {
            config.llm.api_base = base.clone();
        }
        if let Some(ref key) = self.api_key {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(ref model) = self.model {
            config.llm.model = model.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},sled=warn,hyper=info")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = args.app_config()?;

    if args.clear_cache {
        match doc_translator_core::clear_post_edit_cache(&config.cache) {
            Ok(count) => info!("Cleared {} cached post-edits", count),
            Err(e) => tracing::warn!("Failed to clear cache: {}", e),
        }
    }

    // Opens the history and cache databases - fails fast if another instance holds them
    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(CLEANUP_INTERVAL).await;
            let removed = cleanup_state.cleanup_old_jobs().await;
            info!("Completed job cleanup ({} removed)", removed);
        }
    });

    let app = routes::router(state)
        // Job status is polled; never serve it from a cache
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(300 * 1024 * 1024)) // 300MB limit for uploads
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
