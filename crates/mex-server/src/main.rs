//! HTTP server for the MEX assistant.
//!
//! Wires the Gemini client, the Supabase-backed datastore and image storage,
//! the tool dispatcher, and the suggestion generator into an axum router.
//! Configuration comes from an optional YAML file with environment overrides
//! for the credentials.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use mex_core::config::AssistantConfig;
use mex_core::context::MerchantContext;
use mex_core::datastore::SupabaseStore;
use mex_core::driver::{DriverConfig, TurnDriver};
use mex_core::llm::gemini::GeminiClient;
use mex_core::llm::LlmClient;
use mex_core::prompts::SYSTEM_INSTRUCTION;
use mex_core::storage::SupabaseStorage;
use mex_core::suggestions::SuggestionGenerator;
use mex_core::tools::Toolbox;

use routes::{build_router, AppState};

#[derive(Parser, Debug)]
#[clap(author, version, about = "MEX Assistant - merchant analytics chat server")]
struct Cli {
    #[clap(long, short, help = "Path to a YAML configuration file")]
    config: Option<String>,

    #[clap(long, help = "Override the configured bind address, e.g. 0.0.0.0:3001")]
    bind_addr: Option<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading configuration from file: {}", path);
            AssistantConfig::from_file(path)?
        }
        None => AssistantConfig::from_env(),
    };
    config.validate()?;

    let state = build_state(&config)?;

    let bind_addr = cli.bind_addr.unwrap_or_else(|| config.server.bind_addr.clone());
    let bind_socket_addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind_addr, e))?;

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_socket_addr).await?;
    log::info!("MEX assistant server listening on {}", bind_socket_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down gracefully.");
    Ok(())
}

fn build_state(config: &AssistantConfig) -> Result<AppState> {
    let api_key = config.gemini_api_key()?;
    let llm: Arc<dyn LlmClient> = Arc::new(match &config.llm.base_url {
        Some(base_url) => GeminiClient::with_base_url(
            api_key,
            config.llm.model.clone(),
            config.llm.image_model.clone(),
            base_url.clone(),
        ),
        None => GeminiClient::new(
            api_key,
            config.llm.model.clone(),
            config.llm.image_model.clone(),
        ),
    });

    let supabase_url = config
        .supabase
        .url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Supabase URL not configured"))?;
    let anon_key = config.supabase_anon_key()?;
    let data = Arc::new(SupabaseStore::new(supabase_url.clone(), anon_key.clone()));
    let images = Arc::new(SupabaseStorage::new(
        supabase_url,
        anon_key,
        config.supabase.bucket.clone(),
    ));

    let toolbox = Toolbox::new(data, images.clone(), Arc::clone(&llm));
    let driver = TurnDriver::new(
        Arc::clone(&llm),
        toolbox,
        DriverConfig {
            max_tool_rounds: config.llm.max_tool_rounds,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        },
    );
    let suggestions = SuggestionGenerator::new(llm);

    Ok(AppState {
        driver: Arc::new(driver),
        suggestions: Arc::new(suggestions),
        images,
        default_merchant: MerchantContext::new(
            config.server.default_merchant_id.clone(),
            config.server.default_merchant_name.clone(),
        ),
    })
}

/// Resolves when the process receives Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}
