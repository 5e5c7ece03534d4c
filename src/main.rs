//! Sigauth Server
//!
//! HTTP front for wallet-based authentication. Clients request a challenge,
//! sign it with their wallet and exchange the signature for a bearer token.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use sigauth_server::auth::{
    challenge_sweeper, AuthService, ChallengeStore, Clock, CredentialCodec, Eip191Verifier,
    EnsResolver, IdentityEnricher, InMemoryChallengeStore, NoopEnricher, OsRandom, SystemClock,
};
use sigauth_server::config::Config;
use sigauth_server::routes::app_router;
use sigauth_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting sigauth server");

    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET not set, using the development signing secret");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let challenges: Arc<dyn ChallengeStore> = Arc::new(InMemoryChallengeStore::new(
        config.challenge_ttl,
        clock.clone(),
        Arc::new(OsRandom),
    ));

    let identity: Arc<dyn IdentityEnricher> = if config.ens_enabled {
        tracing::info!(rpc_url = %config.eth_rpc_url, "ENS enrichment enabled");
        Arc::new(
            EnsResolver::new(config.eth_rpc_url.clone(), config.ens_timeout)
                .context("Failed to build ENS resolver")?,
        )
    } else {
        tracing::info!("ENS enrichment disabled");
        Arc::new(NoopEnricher)
    };

    let credentials = CredentialCodec::new(config.jwt_secret.as_bytes(), config.jwt_ttl, clock);

    let auth_service = Arc::new(AuthService::new(
        challenges.clone(),
        Arc::new(Eip191Verifier),
        identity,
        credentials,
        config.ens_timeout,
    ));

    let sweep_interval = config.challenge_sweep_interval;
    tokio::spawn(async move {
        tracing::info!("Challenge sweeper task started");
        challenge_sweeper(challenges, sweep_interval).await;
        tracing::error!("Challenge sweeper task exited unexpectedly");
    });

    let app = app_router(AppState::new(auth_service))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.trim().is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
