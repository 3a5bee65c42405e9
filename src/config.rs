// Service settings. Everything comes from environment variables so the same
// binary runs next to any sidecar; unset variables fall back to the values
// the sidecar components are deployed with.
use crate::subscription::DISCOVERY_ROUTE;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7006;
pub const DEFAULT_PUBSUB_NAME: &str = "orderpubsub";
pub const DEFAULT_TOPIC: &str = "orders";
pub const DEFAULT_ROUTE: &str = "/orders";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

const RESERVED_ROUTES: &[&str] = &[DISCOVERY_ROUTE, "/health", "/metrics"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub pubsub_name: String,
    pub topic: String,
    pub route: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            pubsub_name: DEFAULT_PUBSUB_NAME.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            route: DEFAULT_ROUTE.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. `from_env` passes
    /// `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(host) = lookup("APP_HOST") {
            settings.host = non_empty("APP_HOST", host)?;
        }

        if let Some(port) = lookup("APP_PORT") {
            settings.port = match port.trim().parse::<u16>() {
                Ok(p) => p,
                Err(e) => {
                    return Err(anyhow::anyhow!("Invalid APP_PORT value, expected a number, got: {}", e));
                }
            };
        }

        if let Some(name) = lookup("PUBSUB_NAME") {
            settings.pubsub_name = non_empty("PUBSUB_NAME", name)?;
        }

        if let Some(topic) = lookup("PUBSUB_TOPIC") {
            settings.topic = non_empty("PUBSUB_TOPIC", topic)?;
        }

        if let Some(route) = lookup("APP_ROUTE") {
            settings.route = parse_route(&non_empty("APP_ROUTE", route)?)?;
        }

        if let Some(limit) = lookup("MAX_BODY_BYTES") {
            settings.max_body_bytes = match limit.trim().parse::<usize>() {
                Ok(0) => return Err(anyhow::anyhow!("MAX_BODY_BYTES must be greater than zero")),
                Ok(n) => n,
                Err(e) => {
                    return Err(anyhow::anyhow!("Invalid MAX_BODY_BYTES value, expected a number, got: {}", e));
                }
            };
        }

        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Routes are registered verbatim, so anything the router would read as a
/// capture, wildcard or a path we already serve is refused here.
fn parse_route(raw: &str) -> anyhow::Result<String> {
    let route = if raw.starts_with('/') { raw.to_string() } else { format!("/{}", raw) };

    if route.contains(['{', '}', '*']) || route.split('/').any(|segment| segment.starts_with(':')) {
        return Err(anyhow::anyhow!(
            "Invalid APP_ROUTE value, expected a literal path without captures or wildcards, got: {}",
            route
        ));
    }
    if RESERVED_ROUTES.contains(&route.as_str()) {
        return Err(anyhow::anyhow!("Invalid APP_ROUTE value, {} is already served by this service", route));
    }
    Ok(route)
}

fn non_empty(key: &str, value: String) -> anyhow::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("{} must not be empty", key));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind_addr(), "0.0.0.0:7006");
    }

    #[test]
    fn test_overrides_are_applied() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", " 8080 "),
            ("PUBSUB_NAME", "kafka-pubsub"),
            ("PUBSUB_TOPIC", "new-orders"),
            ("APP_ROUTE", "incoming"),
            ("MAX_BODY_BYTES", "2048"),
        ]))
        .unwrap();

        assert_eq!(settings.bind_addr(), "127.0.0.1:8080");
        assert_eq!(settings.pubsub_name, "kafka-pubsub");
        assert_eq!(settings.topic, "new-orders");
        assert_eq!(settings.route, "/incoming");
        assert_eq!(settings.max_body_bytes, 2048);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[("APP_PORT", "seventy")])).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));

        assert!(Settings::from_lookup(lookup_from(&[("APP_PORT", "70000")])).is_err());
    }

    #[test]
    fn test_empty_names_and_zero_limit_are_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[("PUBSUB_TOPIC", "  ")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("MAX_BODY_BYTES", "0")])).is_err());

        let err = Settings::from_lookup(lookup_from(&[("MAX_BODY_BYTES", "abc")])).unwrap_err();
        assert!(err.to_string().contains("MAX_BODY_BYTES"));
    }

    #[test]
    fn test_route_with_router_syntax_is_rejected() {
        for bad in ["/orders/{", "/orders/{id}", "/orders/*rest", "/orders/:id", "orders}"] {
            let err = Settings::from_lookup(lookup_from(&[("APP_ROUTE", bad)])).unwrap_err();
            assert!(err.to_string().contains("APP_ROUTE"), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_route_clashing_with_builtin_routes_is_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[("APP_ROUTE", "/dapr/subscribe")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("APP_ROUTE", "health")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("APP_ROUTE", "/orders/v2")])).is_ok());
    }
}
