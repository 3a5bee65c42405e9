// CloudEvents unwrapping. The sidecar delivers pub/sub messages as
// structured-mode CloudEvents (`application/cloudevents+json`). This
// middleware replaces such a request body with the event payload so the
// route handlers only ever see the plain message.
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header::{CONTENT_LENGTH, CONTENT_TYPE}, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use http_body_util::LengthLimitError;
use prometheus::IntCounter;
use serde::Deserialize;
use tracing::debug;

pub const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json";
const JSON_CONTENT_TYPE: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    id: Option<String>,
    source: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    specversion: Option<String>,
    datacontenttype: Option<String>,
    time: Option<String>,
    topic: Option<String>,
    pubsubname: Option<String>,
    data: Option<serde_json::Value>,
    data_base64: Option<String>,
}

/// Payload extracted from an envelope, ready to become the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// State for `unwrap_cloudevents`.
#[derive(Clone)]
pub struct CloudEventsLayer {
    pub max_body_bytes: usize,
    pub unwrapped: IntCounter,
}

/// True for `application/json`, `text/json` and any `+json` suffix type.
pub fn is_json_media_type(content_type: &str) -> bool {
    let media = media_type(content_type);
    media == JSON_CONTENT_TYPE || media == "text/json" || media.ends_with("+json")
}

fn media_type(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// Parse a structured-mode envelope and pull out its payload.
///
/// `data` wins over `data_base64`. JSON payloads are re-serialized as they
/// came; a string `data` with a non-JSON `datacontenttype` is passed as its
/// raw text. An envelope without data yields an empty body.
pub fn unwrap_envelope(bytes: &[u8]) -> anyhow::Result<Unwrapped> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    if !value.is_object() {
        return Err(anyhow::anyhow!("CloudEvent envelope must be a JSON object"));
    }
    let envelope: Envelope = serde_json::from_value(value)?;

    let received_at = envelope
        .time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc));
    debug!(
        id = envelope.id.as_deref().unwrap_or_default(),
        source = envelope.source.as_deref().unwrap_or_default(),
        event_type = envelope.event_type.as_deref().unwrap_or_default(),
        specversion = envelope.specversion.as_deref().unwrap_or_default(),
        topic = envelope.topic.as_deref().unwrap_or_default(),
        pubsubname = envelope.pubsubname.as_deref().unwrap_or_default(),
        time = ?received_at,
        "unwrapping CloudEvent"
    );

    let declared = envelope.datacontenttype.clone();

    if let Some(data) = envelope.data {
        return match (declared, data) {
            (Some(ct), serde_json::Value::String(text)) if !is_json_media_type(&ct) => {
                Ok(Unwrapped { body: text.into_bytes(), content_type: ct })
            }
            (_, data) => Ok(Unwrapped {
                body: serde_json::to_vec(&data)?,
                content_type: JSON_CONTENT_TYPE.to_string(),
            }),
        };
    }

    if let Some(encoded) = envelope.data_base64 {
        let body = STANDARD
            .decode(encoded.trim())
            .map_err(|e| anyhow::anyhow!("invalid data_base64: {}", e))?;
        return Ok(Unwrapped { body, content_type: declared.unwrap_or_else(|| OCTET_STREAM.to_string()) });
    }

    Ok(Unwrapped { body: Vec::new(), content_type: declared.unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()) })
}

/// Middleware: unwrap `application/cloudevents+json` bodies, pass every
/// other request through untouched.
pub async fn unwrap_cloudevents(State(layer): State<CloudEventsLayer>, req: Request, next: Next) -> Response {
    let is_cloudevent = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| media_type(ct) == CLOUDEVENTS_CONTENT_TYPE)
        .unwrap_or(false);

    if !is_cloudevent {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let bytes = match to_bytes(body, layer.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => {
            let too_large = e
                .into_inner()
                .downcast_ref::<LengthLimitError>()
                .is_some();
            if too_large {
                return (StatusCode::PAYLOAD_TOO_LARGE, "CloudEvent body too large").into_response();
            }
            return (StatusCode::BAD_REQUEST, "failed to read CloudEvent body").into_response();
        }
    };

    let unwrapped = match unwrap_envelope(&bytes) {
        Ok(u) => u,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid CloudEvent: {}", e)).into_response(),
    };

    let content_type = match HeaderValue::from_str(&unwrapped.content_type) {
        Ok(v) => v,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid datacontenttype").into_response(),
    };

    parts.headers.insert(CONTENT_TYPE, content_type);
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(unwrapped.body.len()));
    layer.unwrapped.inc();

    next.run(Request::from_parts(parts, Body::from(unwrapped.body))).await
}
