//! Quince Cart - per-user shopping cart service.
//!
//! This binary serves the cart API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - Bearer tokens resolved through the identity service before any cart
//!   logic runs
//! - Product price/stock/variant data fetched from the catalog service at
//!   write time, never cached
//! - `PostgreSQL` for cart documents (one JSONB document per user)
//!
//! Two transports share one aggregator: the public REST surface under
//! `/cart` and the internal command-dispatch surface under `/rpc`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quince_cart::catalog::HttpCatalogClient;
use quince_cart::config::CartConfig;
use quince_cart::identity::HttpIdentityClient;
use quince_cart::routes;
use quince_cart::service::CartService;
use quince_cart::state::AppState;
use quince_cart::store::{self, PgCartStore};

use sentry::integrations::tracing as sentry_tracing;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = CartConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quince_cart=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Initialize database connection pool and schema
    let pool = store::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Upstream clients share one bounded timeout
    let catalog = HttpCatalogClient::new(&config.catalog_url, config.upstream_timeout)
        .expect("Failed to build catalog client");
    let identity = HttpIdentityClient::new(&config.identity_url, config.upstream_timeout)
        .expect("Failed to build identity client");

    // Build application state
    let cart = CartService::new(Arc::new(PgCartStore::new(pool.clone())), Arc::new(catalog));
    let state = AppState::new(cart, Arc::new(identity), Some(pool));

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("cart service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
