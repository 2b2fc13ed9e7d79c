//! shopfilter - storefront filter URL builder and recommendation proxy
//!
//! ## Usage
//!
//! ### HTTP Server Mode
//! ```bash
//! LLM_API_KEY=sk-... shopfilter serve --port 3000
//! ```
//!
//! ### Build a storefront URL
//! ```bash
//! shopfilter url filters.json
//! ```
//!
//! ### Ask the model for filters
//! ```bash
//! shopfilter recommend "running shoes" --past "trail shoes" --filters filters.json
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shopfilter::filters::FilterCollection;
use shopfilter::llm::{
    LlmClient, LlmConfig, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use shopfilter::prompts::build_filter_recommendation_prompt;
use shopfilter::recommend::{
    parse_recommended_filters, FilteredRecommendationRequest, RecommendationService,
};
use shopfilter::storefront_url::{build_url, DEFAULT_STOREFRONT_URL};
use shopfilter::server;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Storefront filter URL builder and LLM filter recommendation proxy
#[derive(Parser)]
#[command(name = "shopfilter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log output format
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Print the storefront URL for a filter collection (JSON file or stdin)
    Url {
        /// Filter collection JSON file; reads stdin when omitted
        filters: Option<PathBuf>,

        /// Storefront search endpoint
        #[arg(long, default_value = DEFAULT_STOREFRONT_URL)]
        base_url: String,
    },

    /// Print the recommendation prompt without calling the model
    Prompt {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Ask the model for filter recommendations
    Recommend {
        #[command(flatten)]
        session: SessionArgs,

        /// Storefront search endpoint used for the recommended URL
        #[arg(long, default_value = DEFAULT_STOREFRONT_URL)]
        base_url: String,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

/// Shopper session inputs
#[derive(Args)]
struct SessionArgs {
    /// Current search query
    query: String,

    /// Currently applied filters (JSON file)
    #[arg(long)]
    filters: Option<PathBuf>,

    /// Past search query (repeatable, oldest first)
    #[arg(long = "past")]
    past_queries: Vec<String>,
}

/// Model provider settings
#[derive(Args)]
struct LlmArgs {
    /// LLM API base URL (OpenAI-compatible)
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    llm_base_url: String,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_key: Option<String>,

    /// Default model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    llm_model: String,

    /// Default sampling temperature (0-2)
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Default completion token limit
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Request JSON-object responses from the provider
    #[arg(long)]
    json_response: bool,

    /// Request timeout in seconds (0 keeps the transport default)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl LlmArgs {
    fn into_config(self) -> Result<LlmConfig> {
        let api_key = self
            .llm_key
            .context("LLM API key is required (--llm-key or LLM_API_KEY)")?;
        let config = LlmConfig {
            base_url: self.llm_base_url,
            api_key,
            model: self.llm_model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_response: self.json_response,
            timeout_secs: self.timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.log_format == "json" {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port, host, llm } => run_server(host, port, llm).await,
        Commands::Url { filters, base_url } => print_url(filters.as_deref(), &base_url),
        Commands::Prompt { session } => print_prompt(session),
        Commands::Recommend {
            session,
            base_url,
            llm,
        } => run_recommend(session, &base_url, llm).await,
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, llm: LlmArgs) -> Result<()> {
    let config = llm.into_config()?;
    let service = RecommendationService::new(LlmClient::new(config)?);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    info!(host = %host, port = port, "Starting HTTP server");
    println!("Server is running on http://{}", addr);

    server::serve(addr, service).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// Offline Commands
// ============================================================================

/// Load filters from a file, or fall back to the empty collection.
fn load_filters(path: Option<&Path>) -> Result<FilterCollection> {
    match path {
        Some(p) => FilterCollection::from_json_file(p)
            .with_context(|| format!("Failed to load filters from {:?}", p)),
        None => Ok(FilterCollection::empty()),
    }
}

fn print_url(path: Option<&Path>, base_url: &str) -> Result<()> {
    let filters = match path {
        Some(_) => load_filters(path)?,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read filters from stdin")?;
            FilterCollection::from_json_str(&input).context("Invalid filter JSON on stdin")?
        }
    };

    println!("{}", build_url(base_url, &filters));
    Ok(())
}

fn print_prompt(session: SessionArgs) -> Result<()> {
    let filters = load_filters(session.filters.as_deref())?;
    let prompt =
        build_filter_recommendation_prompt(&filters, &session.query, &session.past_queries)?;
    println!("{}", prompt);
    Ok(())
}

// ============================================================================
// Recommendation
// ============================================================================

async fn run_recommend(session: SessionArgs, base_url: &str, llm: LlmArgs) -> Result<()> {
    let filters = load_filters(session.filters.as_deref())?;
    let service = RecommendationService::new(LlmClient::new(llm.into_config()?)?);

    let response = service
        .generate_filtered(FilteredRecommendationRequest {
            filters_applied: Some(filters),
            current_query: Some(session.query),
            past_queries: Some(session.past_queries),
            ..Default::default()
        })
        .await
        .context("Recommendation request failed")?;

    println!("{}", response.text);

    match parse_recommended_filters(&response.text) {
        Some(recommended) => {
            println!();
            println!("Storefront URL: {}", build_url(base_url, &recommended));
        }
        None => warn!("Model response is not a filter collection; no URL generated"),
    }

    Ok(())
}
