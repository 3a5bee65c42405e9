// `main.rs` only wires logging and delegates to `server::run()`. The
// subscriber itself lives in `server`, `handlers`, `cloudevents` and the
// small model modules.
mod cloudevents;
mod config;
mod handlers;
mod metrics;
mod order;
mod server;
mod subscription;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    server::run().await
}
