//! learnsmart-api - learning platform backend service
//!
//! Serves accounts, the course catalog, enrollments, gamification and the
//! AI recommendation/roadmap endpoints over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use clap::{Parser, Subcommand};
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use learnsmart_api::services::{ChatModel, LlmError, OpenAiClient};
use learnsmart_api::{build_router, db::users, AppState};
use learnsmart_common::auth::{load_signing_secret, Role, TokenKeys};
use learnsmart_common::config::{AppConfig, CliOverrides, DEFAULT_LOG_LEVEL};
use learnsmart_common::db::init_database;

/// Command-line arguments for learnsmart-api
#[derive(Parser, Debug)]
#[command(name = "learnsmart-api")]
#[command(about = "Learning platform backend service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "LEARNSMART_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = "LEARNSMART_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "LEARNSMART_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Change the role of an existing account, then exit
    SetRole {
        /// Account email
        email: String,
        /// user, instructor or admin
        role: Role,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; otherwise the configured level is applied once known
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let initial_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let (filter_layer, filter_handle) = reload::Layer::new(initial_filter);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting LearnSmart API (learnsmart-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = AppConfig::resolve(&CliOverrides {
        config: args.config,
        bind: args.bind,
        port: args.port,
        database: args.database,
    })
    .context("Invalid configuration")?;

    if !rust_log_set {
        match EnvFilter::try_new(&config.log_level) {
            Ok(filter) => {
                if let Err(e) = filter_handle.reload(filter) {
                    warn!("Could not apply log level '{}': {}", config.log_level, e);
                }
            }
            Err(e) => warn!("Ignoring invalid log level '{}': {}", config.log_level, e),
        }
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if let Some(Command::SetRole { email, role }) = args.command {
        if users::set_role(&pool, &email, role).await? {
            info!("Set role of {} to {}", email, role);
            return Ok(());
        }
        anyhow::bail!("No account registered with email {}", email);
    }

    let secret = match config.jwt_secret.clone() {
        Some(secret) => secret,
        None => load_signing_secret(&pool)
            .await
            .context("Failed to load token signing secret")?,
    };
    let tokens = TokenKeys::new(
        secret.as_bytes(),
        chrono::Duration::days(config.token_ttl_days),
    );

    let llm: Option<Arc<dyn ChatModel>> = match OpenAiClient::from_settings(&config.openai) {
        Ok(client) => {
            info!("AI features enabled (model {})", client.model());
            Some(Arc::new(client))
        }
        Err(LlmError::NotConfigured) => {
            warn!("OPENAI_API_KEY not set; recommendation and roadmap endpoints will answer 503");
            None
        }
        Err(e) => return Err(e).context("Failed to create LLM client"),
    };

    let state = AppState::new(pool, tokens, llm);
    let app = build_router(state).layer(cors_layer(&config.cors_origin)?);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("learnsmart-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// CORS for the browser frontend; `*` allows any origin
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(origin.trim())
            .with_context(|| format!("Invalid CORS origin '{}'", origin))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
