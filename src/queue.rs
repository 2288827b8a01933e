//! Export queue: hands export requests to an external worker.
//!
//! Only the producer side lives here. Whatever consumes the queue is outside
//! this service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, BackendError};
use crate::models::ExportQueueMessage;

pub const QUEUE_ERROR: &str = "QUEUE_ERROR";

#[async_trait]
pub trait ExportQueue: Send + Sync {
    /// Sends the message and returns the queue's tracking id for it.
    async fn send(&self, message: &ExportQueueMessage) -> Result<String, AppError>;
}

/// Checks that a queue address is configured and looks like an SQS URL.
pub fn validate_queue_url(queue_url: Option<&str>) -> Result<&str, AppError> {
    let Some(url) = queue_url else {
        return Err(AppError::configuration(
            "SQS_QUEUE_URL environment variable is not configured. Please set this to your SQS queue URL.",
            json!({ "environmentVariable": "SQS_QUEUE_URL" }),
        ));
    };

    if !url.starts_with("https://sqs.") || !url.contains(".amazonaws.com/") {
        return Err(AppError::configuration(
            "SQS_QUEUE_URL must be a valid SQS queue URL (e.g., https://sqs.us-east-1.amazonaws.com/123456789012/queue-name)",
            json!({ "environmentVariable": "SQS_QUEUE_URL", "received": url }),
        ));
    }

    Ok(url)
}

fn send_failed(reason: impl Into<String>) -> AppError {
    let reason = reason.into();
    AppError::Queue(
        BackendError::new(QUEUE_ERROR, format!("Failed to queue export request: {reason}"))
            .with_details(json!({ "reason": reason })),
    )
}

fn string_attribute(value: &str) -> Result<MessageAttributeValue, AppError> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(value)
        .build()
        .map_err(|e| send_failed(e.to_string()))
}

/// Export queue backed by SQS.
#[derive(Clone)]
pub struct SqsExportQueue {
    client: Client,
    queue_url: Option<String>,
}

impl SqsExportQueue {
    pub fn new(client: Client, queue_url: Option<String>) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl ExportQueue for SqsExportQueue {
    async fn send(&self, message: &ExportQueueMessage) -> Result<String, AppError> {
        let queue_url = validate_queue_url(self.queue_url.as_deref())?;
        let body = serde_json::to_string(message).map_err(|e| send_failed(e.to_string()))?;

        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .message_attributes("exportType", string_attribute(message.export_type.as_str())?)
            .message_attributes("requestedAt", string_attribute(&message.requested_at)?)
            .send()
            .await
            .map_err(|e| {
                let normalized = BackendError::from_aws(&e, "SQS send failed");
                tracing::error!(queue_url, code = %normalized.code, "Failed to send message to SQS queue: {}", normalized.message);
                send_failed(normalized.message)
            })?;

        let Some(message_id) = output.message_id() else {
            return Err(send_failed(
                "Failed to send message to SQS queue - no MessageId returned",
            ));
        };

        tracing::info!(message_id, export_id = %message.export_id, "Export message sent to SQS queue");
        Ok(message_id.to_string())
    }
}

/// In-process queue that records every message it is given.
#[derive(Clone, Default)]
pub struct MemoryExportQueue {
    messages: Arc<Mutex<Vec<ExportQueueMessage>>>,
}

impl MemoryExportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ExportQueueMessage> {
        self.messages.lock().expect("export queue lock poisoned").clone()
    }
}

#[async_trait]
impl ExportQueue for MemoryExportQueue {
    async fn send(&self, message: &ExportQueueMessage) -> Result<String, AppError> {
        let mut messages = self.messages.lock().expect("export queue lock poisoned");
        messages.push(message.clone());
        Ok(Uuid::new_v4().to_string())
    }
}
