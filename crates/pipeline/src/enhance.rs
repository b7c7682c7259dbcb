//! Best-effort prompt enhancement.
//!
//! Enhancement never fails a job. Every call yields an [`EnhanceOutcome`]:
//! the rewritten prompt, a skip, or a fallback carrying the reason the
//! original prompt is used instead.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default chat-completions endpoint.
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default enhancement model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Per-request timeout on the chat-completions call.
pub const DEFAULT_ENHANCE_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_TOKENS: u32 = 280;
const TEMPERATURE: f64 = 0.7;

/// Style phrases for intensities 1 through 10.
const INTENSITY_PHRASES: [&str; 10] = [
    "subtle and realistic",
    "slightly stylized",
    "moderately artistic",
    "noticeably creative",
    "distinctly stylized",
    "highly artistic",
    "dramatically enhanced",
    "intensely cinematic",
    "extremely stylized",
    "maximum artistic interpretation, highly detailed, and visually rich",
];

/// Result of an enhancement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhanceOutcome {
    Enhanced(String),
    /// Enhancement was not attempted (no credentials, empty prompt).
    Skipped,
    /// Enhancement was attempted and failed; the original prompt stands.
    Fallback { reason: String },
}

impl EnhanceOutcome {
    /// The prompt to submit: the enhanced text, or `original`.
    pub fn into_prompt(self, original: &str) -> String {
        match self {
            Self::Enhanced(text) => text,
            Self::Skipped | Self::Fallback { .. } => original.to_string(),
        }
    }
}

/// Rewrites a user prompt before generation.
#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    fn is_available(&self) -> bool;

    async fn enhance(&self, prompt: &str, intensity: u8) -> EnhanceOutcome;
}

/// Enhancer that always skips.
pub struct DisabledEnhancer;

#[async_trait]
impl PromptEnhancer for DisabledEnhancer {
    fn is_available(&self) -> bool {
        false
    }

    async fn enhance(&self, _prompt: &str, _intensity: u8) -> EnhanceOutcome {
        EnhanceOutcome::Skipped
    }
}

// ---------------------------------------------------------------------------
// OpenAI chat completions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Enhancer backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiEnhancer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenAiEnhancer {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_ENHANCE_TIMEOUT),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        }
    }

    /// Point the enhancer at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Bound each request by `timeout` instead of the default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    async fn request(&self, key: &str, prompt: &str, intensity: u8) -> Result<String, String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_message(intensity),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Original prompt for LTX: \"{prompt}\""),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {text}", status.as_u16()));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| e.to_string())?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| "empty completion".to_string())
    }
}

#[async_trait]
impl PromptEnhancer for OpenAiEnhancer {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn enhance(&self, prompt: &str, intensity: u8) -> EnhanceOutcome {
        let Some(key) = self.api_key.as_deref() else {
            tracing::info!("No enhancement key configured, skipping prompt enhancement");
            return EnhanceOutcome::Skipped;
        };
        if prompt.trim().is_empty() {
            return EnhanceOutcome::Skipped;
        }

        match self.request(key, prompt, intensity).await {
            Ok(enhanced) => {
                tracing::info!(original_len = prompt.len(), enhanced_len = enhanced.len(), "Prompt enhanced");
                EnhanceOutcome::Enhanced(enhanced)
            }
            Err(reason) => EnhanceOutcome::Fallback { reason },
        }
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build reqwest HTTP client")
}

/// Style phrase for an intensity, with a mid-range default.
pub fn intensity_phrase(intensity: u8) -> &'static str {
    match intensity {
        1..=10 => INTENSITY_PHRASES[usize::from(intensity) - 1],
        _ => "moderately artistic",
    }
}

fn system_message(intensity: u8) -> String {
    format!(
        "You are an expert creative assistant transforming user text prompts into vivid, \
         cinematic prompts for the LTX AI video generation model. LTX prefers prompts that are \
         a single flowing paragraph (max 200 words) structured like a shot list: 1. Start with \
         main action. 2. Add specific movements/gestures. 3. Describe character/object \
         appearances. 4. Include background/environment. 5. Specify camera angles/movements. \
         6. Describe lighting/colors. 7. Note changes/sudden events. The style intensity should \
         be: \"{}\". Focus on literal and precise descriptions. Output ONLY the enhanced prompt \
         paragraph.",
        intensity_phrase(intensity)
    )
}
