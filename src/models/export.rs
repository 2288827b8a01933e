use serde::{Deserialize, Serialize};

/// A finished export: a signed link to the uploaded CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub download_url: String,
    pub file_name: String,
    pub expires_at: String,
}

/// An export handed off to the queue for asynchronous processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedExport {
    pub export_id: String,
    pub queued_at: String,
    pub message: String,
}

/// Result of `POST /export`. The two shapes are mutually exclusive and
/// serialize without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportOutcome {
    Ready(ExportResponse),
    Queued(QueuedExport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    Csv,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
        }
    }
}

/// Body of an export request placed on the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQueueMessage {
    pub export_id: String,
    pub requested_at: String,
    pub export_type: ExportType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Map<String, serde_json::Value>>,
}
