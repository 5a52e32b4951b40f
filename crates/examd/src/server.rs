//! HTTP server for examd

use crate::config::Config;
use crate::generator::TaskGenerator;
use crate::inference::OllamaEngine;
use crate::network::metrics::Metrics;
use crate::network::middleware::{
    rate_limit_middleware, spawn_sweeper, Budget, RateLimitGate, RateLimiter,
};
use crate::provider::HtmlTaskSource;
use crate::resolver::AnswerResolver;
use crate::routes;
use anyhow::{Context, Result};
use axum::{middleware, Router};
use exam_common::{PolynomialSolver, TaskCache};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub generator: Arc<TaskGenerator>,
    pub metrics: Metrics,
    /// Service-wide budget
    pub default_limiter: RateLimiter,
    /// Budget for `/get_task`
    pub generation_limiter: RateLimiter,
    pub start_time: Instant,
}

impl AppState {
    /// Wire limiters for `config` around an existing generator
    pub fn new(config: Config, generator: Arc<TaskGenerator>, metrics: Metrics) -> Self {
        let default_limiter = RateLimiter::new_with_metrics(
            Budget::new(
                "default",
                config.limits.default_requests,
                config.limits.default_window(),
            ),
            metrics.clone(),
        );
        let generation_limiter = RateLimiter::new_with_metrics(
            Budget::new(
                "generation",
                config.limits.generation_requests,
                config.limits.generation_window(),
            ),
            metrics.clone(),
        );

        Self {
            config,
            generator,
            metrics,
            default_limiter,
            generation_limiter,
            start_time: Instant::now(),
        }
    }

    /// Build the production components described by `config`
    pub async fn from_config(config: Config) -> Result<Self> {
        let metrics = Metrics::new().context("Failed to register metrics")?;

        let cache = TaskCache::open_with_timeout(&config.cache.path, config.cache.busy_timeout())
            .await
            .with_context(|| format!("Failed to open task cache at {}", config.cache.path.display()))?;

        let source = HtmlTaskSource::new(config.provider.clone())
            .context("Failed to build task source")?;
        let engine = OllamaEngine::new(&config.inference)
            .context("Failed to build inference engine")?;

        let resolver = AnswerResolver::new(
            Arc::new(PolynomialSolver),
            Arc::new(engine),
            &config.resolver,
            &config.inference,
        );

        let generator = TaskGenerator::new(
            Arc::new(source),
            Arc::new(resolver),
            cache,
            metrics.clone(),
            config.provider.timeout(),
        );

        Ok(Self::new(config, Arc::new(generator), metrics))
    }
}

/// Router with both admission budgets applied
pub fn build_router(state: Arc<AppState>) -> Router {
    let trust_forwarded_for = state.config.server.trust_forwarded_for;
    let generation_gate = RateLimitGate {
        limiter: state.generation_limiter.clone(),
        trust_forwarded_for,
    };
    let default_gate = RateLimitGate {
        limiter: state.default_limiter.clone(),
        trust_forwarded_for,
    };

    Router::new()
        .merge(routes::task_routes(generation_gate))
        .merge(routes::lookup_routes())
        .merge(routes::health_routes())
        .merge(routes::metrics_routes())
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            default_gate,
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until a shutdown signal arrives
pub async fn run(state: AppState) -> Result<()> {
    let state = Arc::new(state);
    let addr = state.config.server.bind.clone();

    let sweeper = spawn_sweeper(
        vec![
            state.default_limiter.clone(),
            state.generation_limiter.clone(),
        ],
        state.config.limits.sweep_interval(),
    );

    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Listening on http://{} (cache: {})",
        addr,
        state.generator.cache().path().display()
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    info!("Server stopped");
    served.context("HTTP server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received, draining connections");
}
