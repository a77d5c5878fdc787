use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FeedbackEntry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

/// Polyline-encoded line geometry, passed through to the map untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedLine {
    pub line: String,
}

/// Geometry to highlight on the map focus layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderData {
    #[serde(default)]
    pub points: Vec<LonLat>,
    #[serde(default)]
    pub lines: Vec<EncodedLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,
}

impl RenderData {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty()
    }
}

/// Structured partial-content payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default)]
    pub render: RenderData,
}

/// One page of a paginated list. Numbered lists report `num_pages`,
/// continuation lists report `has_more` and the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Typed view over a successful form response. The raw body is kept so
/// callers can read domain-specific fields (tokens, secrets, resource URLs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSuccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub detail: Vec<FeedbackEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FormSuccess {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}
