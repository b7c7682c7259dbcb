//! The boundary between the job pipeline and a remote generation backend.
//!
//! A backend runs one long operation per request. While it runs it pushes
//! [`QueueUpdate`]s into a [`ProgressSender`]; the pipeline consumes them
//! in arrival order. The call resolves to a [`GenerationOutput`] pointing
//! at the finished artifact, or a [`RemoteError`].

use async_trait::async_trait;
use genesis_core::params::BackendParams;
use tokio::sync::mpsc;

/// Channel the client pushes progress updates into.
pub type ProgressSender = mpsc::UnboundedSender<QueueUpdate>;

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: BackendParams,
}

/// Successful result of a generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    /// Where the finished artifact can be downloaded from.
    pub artifact_url: String,
    /// Declared content type, `application/octet-stream` when unknown.
    pub content_type: String,
    pub seed: Option<i64>,
    /// Other backend-reported fields, passed through untouched.
    pub metadata: Option<serde_json::Value>,
}

/// Errors from a remote generation call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status code.
    #[error("Fal API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The backend reported that generation failed.
    #[error("{0}")]
    Generation(String),

    /// The call completed but the result lacks the expected fields.
    #[error("Malformed generation result: {0}")]
    MalformedResult(String),

    /// No credentials are configured for the backend.
    #[error("Generation backend is not configured")]
    NotConfigured,
}

/// Queue state reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    InQueue { position: Option<u32> },
    InProgress,
    Completed,
    /// A status string this client does not know. Treated as still working.
    Other(String),
}

impl QueueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InQueue { .. } => "IN_QUEUE",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Other(s) => s,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueUpdate {
    pub status: QueueStatus,
    /// Log lines reported so far, oldest first.
    pub logs: Vec<String>,
}

impl QueueUpdate {
    pub fn new(status: QueueStatus) -> Self {
        Self {
            status,
            logs: Vec::new(),
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Whether the backend is actively working on the request.
    ///
    /// Waiting in the queue is not activity; progress should not creep.
    pub fn is_activity(&self) -> bool {
        !matches!(self.status, QueueStatus::InQueue { .. })
    }

    /// Human-readable status line for the job record.
    pub fn status_line(&self) -> String {
        match (&self.status, self.logs.last()) {
            (QueueStatus::InQueue { position: Some(p) }, _) => {
                format!("Waiting in queue (position {p})")
            }
            (QueueStatus::InQueue { position: None }, _) => "Waiting in queue".to_string(),
            (_, Some(last)) => format!("Processing: {last}"),
            (status, None) => format!("Generation status: {}", status.as_str()),
        }
    }

    /// Text handed to the progress normalizer: the latest log line, if any.
    pub fn progress_text(&self) -> &str {
        self.logs.last().map(String::as_str).unwrap_or("")
    }
}

/// A remote long-running generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Whether credentials are present. Used for health reporting.
    fn is_configured(&self) -> bool;

    /// Run one generation to completion.
    ///
    /// Progress is pushed into `progress`; send failures (the receiver
    /// went away) are ignored. Dropping the returned future abandons the
    /// call.
    async fn generate(
        &self,
        request: GenerationRequest,
        progress: ProgressSender,
    ) -> Result<GenerationOutput, RemoteError>;
}
