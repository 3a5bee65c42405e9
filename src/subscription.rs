// Programmatic subscriptions advertised to the sidecar. The sidecar calls
// the discovery route once at startup and from then on delivers every
// message of `topic` on `pubsubname` as a POST to `route`.
use serde::{Deserialize, Serialize};

use crate::config::Settings;

pub const DISCOVERY_ROUTE: &str = "/dapr/subscribe";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

impl Subscription {
    pub fn new(pubsubname: impl Into<String>, topic: impl Into<String>, route: impl Into<String>) -> Self {
        let route = route.into();
        let route = if route.starts_with('/') { route } else { format!("/{}", route) };
        Subscription { pubsubname: pubsubname.into(), topic: topic.into(), route }
    }

    /// The single orders subscription of this service.
    pub fn orders(settings: &Settings) -> Self {
        Subscription::new(settings.pubsub_name.clone(), settings.topic.clone(), settings.route.clone())
    }
}

/// Static list served by the discovery route.
pub type Subscriptions = std::sync::Arc<Vec<Subscription>>;

pub fn subscriptions(settings: &Settings) -> Subscriptions {
    std::sync::Arc::new(vec![Subscription::orders(settings)])
}
