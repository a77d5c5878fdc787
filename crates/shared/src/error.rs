use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a feedback message attached to a form or one of its fields.
///
/// Servers report validation failures with framework-specific codes
/// (`missing`, `string_too_short`, ...); anything that is not `success` or
/// `info` is treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSeverity {
    Success,
    Info,
    #[serde(other)]
    Error,
}

impl FeedbackSeverity {
    pub fn is_error(self) -> bool {
        self == FeedbackSeverity::Error
    }
}

/// One `{type, loc, msg}` entry of the standard feedback envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    #[serde(rename = "type")]
    pub severity: FeedbackSeverity,
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
}

impl FeedbackEntry {
    pub fn new(severity: FeedbackSeverity, field: Option<&str>, msg: impl Into<String>) -> Self {
        Self {
            severity,
            loc: vec![
                Value::Null,
                field.map_or(Value::Null, |field| Value::String(field.to_string())),
            ],
            msg: msg.into(),
        }
    }

    /// Field addressed by this entry. The first `loc` element is the scope
    /// (`body`, `query`, or null); the field is the last element after it.
    pub fn field(&self) -> Option<&str> {
        self.loc.iter().skip(1).last().and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackDetail {
    Entries(Vec<FeedbackEntry>),
    Message(String),
}

impl Default for FeedbackDetail {
    fn default() -> Self {
        FeedbackDetail::Entries(Vec::new())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackEnvelope {
    #[serde(default)]
    pub detail: FeedbackDetail,
}

impl FeedbackEnvelope {
    pub fn entries(&self) -> &[FeedbackEntry] {
        match &self.detail {
            FeedbackDetail::Entries(entries) => entries,
            FeedbackDetail::Message(_) => &[],
        }
    }
}
