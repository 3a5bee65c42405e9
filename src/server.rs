// `server.rs` composes the HTTP application: it loads settings, builds the
// metrics registry and subscription list, mounts the handlers and the
// CloudEvents middleware, and serves until a shutdown signal arrives.
use crate::{
    cloudevents::{unwrap_cloudevents, CloudEventsLayer},
    config::Settings,
    handlers,
    metrics::Metrics,
    subscription::{subscriptions, DISCOVERY_ROUTE},
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tokio::signal;
use tracing::{info, warn};

pub async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    let metrics = Metrics::new()?;

    let app = app(&settings, metrics);

    let bind_addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    info!(
        pubsubname = %settings.pubsub_name,
        topic = %settings.topic,
        route = %settings.route,
        "advertising subscription"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Build the router. Layers are applied bottom -> top: the `Extension`
/// layers hand shared state to the handlers, `DefaultBodyLimit` holds the
/// `Json` extractor to `max_body_bytes`, and the CloudEvents middleware
/// wraps everything so handlers only see unwrapped payloads.
pub fn app(settings: &Settings, metrics: Metrics) -> Router {
    let cloudevents = CloudEventsLayer {
        max_body_bytes: settings.max_body_bytes,
        unwrapped: metrics.cloudevents_unwrapped.clone(),
    };

    Router::new()
        .route(&settings.route, post(handlers::receive_order))
        .route(DISCOVERY_ROUTE, get(handlers::list_subscriptions))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/health", get(handlers::health))
        .layer(Extension(metrics))
        .layer(Extension(subscriptions(settings)))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(middleware::from_fn_with_state(cloudevents, unwrap_cloudevents))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
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
    info!("shutdown signal received");
}
