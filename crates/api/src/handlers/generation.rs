//! Handler for `POST /api/generate/text-to-video`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use genesis_core::params::DEFAULT_QUALITY;
use genesis_core::prompt::{prompt_problems, sanitize_prompt};
use genesis_pipeline::SubmitOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Rough generation time reported to clients, in seconds.
const ESTIMATED_TIME_SECS: u64 = 60;

/// Request body. Fields are loosely typed so that bad values become
/// validation messages or defaults instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToVideoRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub quality: Option<Value>,
    #[serde(default)]
    pub style_intensity: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToVideoResponse {
    pub success: bool,
    pub job_id: String,
    pub message: &'static str,
    pub estimated_time_in_seconds: u64,
}

/// POST /api/generate/text-to-video
///
/// Validates and sanitizes the prompt, then submits a job. Responds
/// `202 Accepted` immediately; progress is polled via the status route.
pub async fn text_to_video(
    State(state): State<AppState>,
    Json(body): Json<TextToVideoRequest>,
) -> AppResult<(StatusCode, Json<TextToVideoResponse>)> {
    let prompt = match body.prompt.as_ref().and_then(Value::as_str) {
        Some(prompt) => prompt,
        None => {
            return Err(AppError::InvalidPrompt(vec![
                "Prompt is required and must be a string".to_string(),
            ]))
        }
    };

    let problems = prompt_problems(prompt);
    if !problems.is_empty() {
        tracing::warn!(problems = ?problems, "Invalid prompt received");
        return Err(AppError::InvalidPrompt(problems));
    }

    let options = SubmitOptions {
        quality: Some(
            body.quality
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_QUALITY)
                .to_string(),
        ),
        style_intensity: body.style_intensity.as_ref().and_then(intensity_value),
    };

    let job_id = state
        .orchestrator
        .submit(sanitize_prompt(prompt), options)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(TextToVideoResponse {
            success: true,
            job_id: job_id.to_string(),
            message: "Video generation request accepted. Check job status for updates.",
            estimated_time_in_seconds: ESTIMATED_TIME_SECS,
        }),
    ))
}

/// Accept an integer, a float (truncated) or a numeric string.
fn intensity_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intensity_accepts_numbers_and_numeric_strings() {
        assert_eq!(intensity_value(&json!(4)), Some(4));
        assert_eq!(intensity_value(&json!(8.9)), Some(8));
        assert_eq!(intensity_value(&json!(" 3 ")), Some(3));
        assert_eq!(intensity_value(&json!("loud")), None);
        assert_eq!(intensity_value(&json!(null)), None);
    }
}
