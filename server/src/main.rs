//! Wayfarer server binary.
//!
//! Loads configuration, wires the lifecycle engines to the HTTP boundary,
//! and serves until interrupted.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;
use wayfarer_core::environment::SystemClock;
use wayfarer_server::aggregates::{BookingEnvironment, EscalationEnvironment};
use wayfarer_server::auth::provider::StaticIdentityProvider;
use wayfarer_server::config::Config;
use wayfarer_server::engines::{BookingEngine, EscalationEngine};
use wayfarer_server::payment_gateway::MockPaymentGateway;
use wayfarer_server::server::{AppState, build_router};
use wayfarer_server::vouchers::RandomVoucherGenerator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let reply_timeout = Duration::from_secs(config.engine.reply_timeout);
    let clock = Arc::new(SystemClock);

    let booking_engine = BookingEngine::new(
        BookingEnvironment::new(clock.clone(), Arc::new(RandomVoucherGenerator::new())),
        MockPaymentGateway::shared(),
        reply_timeout,
    );
    let escalation_engine =
        EscalationEngine::new(EscalationEnvironment::new(clock), reply_timeout);

    let identity_provider = Arc::new(StaticIdentityProvider::from_entries(
        config
            .auth
            .tokens
            .iter()
            .map(|entry| (entry.token.clone(), entry.identity())),
    ));
    if config.auth.tokens.is_empty() {
        tracing::warn!(
            "no API tokens configured; every request will be rejected as unauthenticated"
        );
    }

    let state = AppState::new(
        booking_engine.clone(),
        escalation_engine.clone(),
        identity_provider,
    );
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "wayfarer server listening");

    // Graceful shutdown: on ctrl-c the engines stop accepting commands and
    // in-flight requests get up to `shutdown_timeout` seconds to drain.
    let drain_started = Arc::new(Notify::new());
    let shutdown = {
        let drain_started = Arc::clone(&drain_started);
        let booking_engine = booking_engine.clone();
        let escalation_engine = escalation_engine.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::info!("shutdown signal received, draining in-flight requests");
            booking_engine.shutdown();
            escalation_engine.shutdown();
            drain_started.notify_waiters();
        }
    };
    let drain_cap = {
        let timeout = Duration::from_secs(config.server.shutdown_timeout);
        async move {
            drain_started.notified().await;
            tokio::time::sleep(timeout).await;
        }
    };

    tokio::select! {
        result = axum::serve(listener, router).with_graceful_shutdown(shutdown) => result?,
        () = drain_cap => tracing::warn!("graceful drain window elapsed, exiting"),
    }

    Ok(())
}
