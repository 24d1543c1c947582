use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use medvoice_realtime_types::Role;

/// The doctor persona selected for a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAgent {
    pub id: u32,
    pub specialist: String,
    #[serde(default)]
    pub description: String,
    /// Display image reference, usually a path under the web app's assets.
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

/// One consultation as persisted by the session record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub id: i64,
    #[serde(default)]
    pub notes: Option<String>,
    pub session_id: String,
    pub selected_doctor: DoctorAgent,
    pub created_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub report: Option<Report>,
}

/// Body of a session creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub notes: String,
    pub selected_doctor: DoctorAgent,
}

/// One finalized utterance of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub text: String,
}

impl TranscriptMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// One value of a generated report. The generator decides the shape; prose,
/// lists and any other JSON value are all kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportField {
    Text(String),
    List(Vec<ReportField>),
    Other(serde_json::Value),
}

impl ReportField {
    /// Lists are shown comma separated; other values as their JSON text.
    pub fn display(&self) -> String {
        match self {
            ReportField::Text(text) => text.clone(),
            ReportField::List(items) => items
                .iter()
                .map(ReportField::display)
                .collect::<Vec<_>>()
                .join(", "),
            ReportField::Other(serde_json::Value::String(text)) => text.clone(),
            ReportField::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for ReportField {
    fn from(value: &str) -> Self {
        ReportField::Text(value.to_string())
    }
}

/// Structured post-call summary produced by the external report generator.
///
/// Every field is optional and may hold any JSON value; fields this type does
/// not know about are kept in `extra` so a stored report round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<ReportField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications_mentioned: Option<ReportField>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body sent to the report generator when a call ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub messages: Vec<TranscriptMessage>,
    pub session_detail: Option<SessionDetail>,
    pub session_id: String,
}
