use serde::{Deserialize, Serialize};
use std::fmt;

/// An order delivered on the orders topic. Only the identifier travels on
/// the wire; unknown fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderId")]
    pub order_id: i32,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order {{ orderId = {} }}", self.order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_is_camel_case() {
        let json = serde_json::to_string(&Order { order_id: 42 }).unwrap();
        assert_eq!(json, r#"{"orderId":42}"#);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let order: Order = serde_json::from_str(r#"{"orderId":3,"note":"x"}"#).unwrap();
        assert_eq!(order.order_id, 3);
    }

    #[test]
    fn test_rejects_non_integer_and_missing_id() {
        assert!(serde_json::from_str::<Order>(r#"{"orderId":"42"}"#).is_err());
        assert!(serde_json::from_str::<Order>(r#"{"orderId":4.5}"#).is_err());
        assert!(serde_json::from_str::<Order>(r#"{"orderId":3000000000}"#).is_err());
        assert!(serde_json::from_str::<Order>(r#"{}"#).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Order { order_id: 7 }.to_string(), "Order { orderId = 7 }");
    }
}
