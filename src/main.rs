// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::net::TcpListener;
use user_service::{
    api::router,
    auth::{JwksManager, RoleExtractor, TokenVerifier},
    config::Config,
    identity::IdentityDatabase,
    state::AppState,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    let verifier = match &config.jwks_url {
        Some(url) => {
            let jwks = JwksManager::new(url.as_str()).expect("Failed to create JWKS client");
            TokenVerifier::production(jwks, config.issuer.clone())
        }
        None => TokenVerifier::development(config.issuer.clone()),
    };
    if verifier.is_development() {
        tracing::warn!("OIDC_JWKS_URL not set: token signatures are NOT verified");
    } else if let Some(jwks) = verifier.jwks() {
        tracing::info!(jwks_url = jwks.jwks_url(), "Verifying tokens against realm JWKS");
    }
    let extractor = RoleExtractor::new(config.client_id.clone());
    tracing::info!(client_id = extractor.target_audience(), "Honouring client roles for audience");

    let database_path = config.database_path();
    let store = IdentityDatabase::open(&database_path).expect("Failed to open identity database");
    tracing::info!(path = %database_path.display(), "Identity database ready");

    let state = AppState::new(Arc::new(store), verifier).with_extractor(extractor);
    let app = router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(addr = %config.bind_addr, "User service listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
