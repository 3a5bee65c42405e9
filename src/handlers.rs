// HTTP handlers. The order handler is a pass-through: whatever the `Json`
// extractor accepts is logged, counted and echoed back. Rejections are the
// extractor's own (400 syntax, 422 shape, 415 content type).
use crate::{metrics::Metrics, order::Order, subscription::Subscriptions};
use axum::{extract::Extension, http::{header::CONTENT_TYPE, StatusCode}, response::IntoResponse, Json};
use tracing::{error, info};

/// Subscriber endpoint for the orders topic.
pub async fn receive_order(Extension(metrics): Extension<Metrics>, Json(order): Json<Order>) -> Json<Order> {
    metrics.orders_received.inc();
    info!(order_id = order.order_id, "Subscriber received : {}", order);
    Json(order)
}

/// Subscription discovery. The sidecar reads this once to learn which
/// topics to deliver and where.
pub async fn list_subscriptions(Extension(subscriptions): Extension<Subscriptions>) -> impl IntoResponse {
    Json((*subscriptions).clone())
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics_handler(Extension(metrics): Extension<Metrics>) -> impl IntoResponse {
    match metrics.render() {
        Ok((body, content_type)) => ([(CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
