// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Recovery Email Guard Service
//!
//! Validates recovery email addresses before they are stored on a user
//! account and keeps the verification API within its rate limits.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honoured):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `VERIFY_MAIL_API_KEY`: Verification API key (required)
//! - `VERIFY_MAIL_API_URL`: Verification API base URL
//! - `LEGACY_DOMAIN`, `MAIN_DOMAIN`: Platform domains refused as recovery domains
//! - `RECOVERY_EMAIL_ALIAS_LIMIT`: Users allowed per `base+tag@domain` family (default: 5)
//! - `EMAIL_CHECK_RATE`, `DOMAIN_CHECK_RATE`: API calls per second (default: 2, 15)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recovery_email_guard::{
    attempts::AttemptThrottle,
    config::Config,
    handlers::{router, AppState},
    limiter::SlidingWindowLimiter,
    metrics::Metrics,
    pipeline::ValidationPipeline,
    recovery::RecoveryEmailService,
    store::{DomainLists, MemoryUserStore},
    verify::VerifyMailClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        api_base_url = %config.verification.api_base_url,
        email_check_rate = config.rate_limit.email_check_rate,
        domain_check_rate = config.rate_limit.domain_check_rate,
        alias_limit = config.rules.alias_limit,
        "Starting recovery email guard"
    );

    // Create application state
    let users = Arc::new(MemoryUserStore::new());
    let lists = Arc::new(DomainLists::from_config(&config.rules));
    let api = Arc::new(VerifyMailClient::new(&config.verification)?);
    let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit.window_duration()));
    let metrics = Arc::new(Metrics::new()?);

    let pipeline = ValidationPipeline::new(
        &config,
        users.clone(),
        lists,
        api,
        limiter.clone(),
        metrics.clone(),
    );
    let service = RecoveryEmailService::new(
        users,
        Arc::new(pipeline),
        AttemptThrottle::new(config.attempts.clone()),
    );

    let state = Arc::new(AppState {
        service,
        metrics,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let cleanup_interval = config.rate_limit.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
            cleanup_state.service.throttle().cleanup().await;
        }
    });

    // Start server
    let app = router(state);
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
