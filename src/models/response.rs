//! Normalized response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a response body was decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Json,
    Xml,
    Text,
}

impl ContentKind {
    /// Classify a `Content-Type` header value
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            ContentKind::Json
        } else if essence == "application/xml" || essence == "text/xml" || essence.ends_with("+xml")
        {
            ContentKind::Xml
        } else {
            ContentKind::Text
        }
    }
}

/// A decoded response body as a generic nested mapping
///
/// JSON and XML bodies decode into the same [`Value`] shape. Anything else is
/// wrapped as `{"content": <body>, "content_type": <header>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawResponse {
    kind: ContentKind,
    content_type: String,
    body: Value,
}

impl RawResponse {
    pub fn json(content_type: impl Into<String>, body: Value) -> Self {
        Self {
            kind: ContentKind::Json,
            content_type: content_type.into(),
            body,
        }
    }

    pub fn xml(content_type: impl Into<String>, body: Value) -> Self {
        Self {
            kind: ContentKind::Xml,
            content_type: content_type.into(),
            body,
        }
    }

    /// Wrap a body that is neither JSON nor XML
    pub fn text(content_type: impl Into<String>, text: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let mut body = Map::new();
        body.insert("content".to_string(), Value::String(text.into()));
        body.insert(
            "content_type".to_string(),
            Value::String(content_type.clone()),
        );

        Self {
            kind: ContentKind::Text,
            content_type,
            body: Value::Object(body),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// The declared `Content-Type` header, as received
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Top-level field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Raw body text for wrapped (non JSON/XML) responses
    pub fn text_content(&self) -> Option<&str> {
        match self.kind {
            ContentKind::Text => self.body.get("content").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Coerce a field that may hold a single object or a list into a list.
///
/// Missing and `null` fields yield an empty list.
pub fn as_sequence(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Read a scalar as a string.
///
/// XML-derived values keep element text under `#text` when the element also
/// carries attributes, so those objects are unwrapped too.
pub fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => scalar_string(map.get("#text")),
        _ => None,
    }
}

/// Read a scalar as an unsigned integer, accepting numeric strings
pub fn scalar_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        other => scalar_string(Some(other)).and_then(|s| s.trim().parse().ok()),
    }
}

/// Europe PMC encodes boolean flags as `"Y"` / `"N"`
pub fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        other => scalar_string(other).is_some_and(|s| s.eq_ignore_ascii_case("y")),
    }
}
