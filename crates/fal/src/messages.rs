//! Fal queue API wire types.
//!
//! The queue protocol has three exchanges: a submit answer carrying the
//! request id and follow-up URLs, status polls, and the final result.
//! Result payloads are model-specific, so they are parsed from a raw
//! [`serde_json::Value`] by [`parse_result`].

use genesis_core::artifact::FALLBACK_CONTENT_TYPE;
use serde::Deserialize;

use crate::provider::{GenerationOutput, QueueStatus, QueueUpdate, RemoteError};

/// Answer to `POST {queue}/{model}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub request_id: String,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Answer to a status poll.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub logs: Option<Vec<LogEntry>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub message: String,
}

/// Terminal classification of a status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Keep polling.
    Pending(QueueUpdate),
    /// Result is ready to be fetched.
    Done(QueueUpdate),
    /// The backend gave up on the request.
    Failed(String),
}

impl StatusResponse {
    pub fn into_outcome(self) -> PollOutcome {
        let logs: Vec<String> = self
            .logs
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.message)
            .filter(|m| !m.trim().is_empty())
            .collect();

        match self.status.as_str() {
            "IN_QUEUE" => PollOutcome::Pending(
                QueueUpdate::new(QueueStatus::InQueue {
                    position: self.queue_position,
                })
                .with_logs(logs),
            ),
            "IN_PROGRESS" => {
                PollOutcome::Pending(QueueUpdate::new(QueueStatus::InProgress).with_logs(logs))
            }
            "COMPLETED" => match self.error.as_ref().and_then(error_detail) {
                Some(detail) => PollOutcome::Failed(detail),
                None => {
                    PollOutcome::Done(QueueUpdate::new(QueueStatus::Completed).with_logs(logs))
                }
            },
            "ERROR" | "FAILED" => PollOutcome::Failed(
                self.error
                    .as_ref()
                    .and_then(error_detail)
                    .unwrap_or_else(|| "Unknown error reported by generation backend".to_string()),
            ),
            other => PollOutcome::Pending(
                QueueUpdate::new(QueueStatus::Other(other.to_string())).with_logs(logs),
            ),
        }
    }
}

/// Pull a human-readable message out of an error payload.
///
/// Accepts a bare string, `{"message": ..}`, `{"detail": ..}`,
/// `{"error": {"message": ..}}`, and `detail` arrays of `{"msg": ..}`.
pub fn error_detail(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(error_detail).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Object(map) => ["message", "msg", "detail", "error"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(error_detail),
        _ => None,
    }
}

/// Extract the artifact location from a result payload.
///
/// Expected shape: `{"video": {"url", "content_type"?, ...}, "seed"?}`.
pub fn parse_result(
    request_id: &str,
    body: &serde_json::Value,
) -> Result<GenerationOutput, RemoteError> {
    let video = body.get("video");
    let url = video
        .and_then(|v| v.get("url"))
        .and_then(|u| u.as_str())
        .filter(|u| !u.is_empty());

    let Some(url) = url else {
        return Err(match error_detail(body) {
            Some(detail) => RemoteError::Generation(detail),
            None => RemoteError::MalformedResult(
                "generation completed but video data is missing".to_string(),
            ),
        });
    };

    let content_type = video
        .and_then(|v| v.get("content_type"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();

    let mut metadata = serde_json::json!({ "request_id": request_id });
    if let Some(video) = video {
        for key in ["file_name", "file_size"] {
            if let Some(value) = video.get(key) {
                metadata[key] = value.clone();
            }
        }
    }

    Ok(GenerationOutput {
        artifact_url: url.to_string(),
        content_type,
        seed: body.get("seed").and_then(|s| s.as_i64()),
        metadata: Some(metadata),
    })
}
