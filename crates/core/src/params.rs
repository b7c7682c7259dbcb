//! Mapping of user-facing generation knobs onto backend parameters.
//!
//! Unknown or out-of-range inputs fall back to fixed defaults instead of
//! erroring; prompt validation happens upstream.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Quality -> inference steps
// ---------------------------------------------------------------------------

/// Quality selector -> `num_inference_steps`.
pub const QUALITY_STEPS: &[(&str, u32)] = &[("480p", 20), ("720p", 30), ("1080p", 40)];

/// Steps used for an unknown or missing quality selector.
pub const DEFAULT_INFERENCE_STEPS: u32 = 30;

/// Quality assumed by the HTTP layer when the client sends none.
pub const DEFAULT_QUALITY: &str = "1080p";

// ---------------------------------------------------------------------------
// Style intensity -> guidance scale
// ---------------------------------------------------------------------------

pub const MIN_STYLE_INTENSITY: u8 = 1;
pub const MAX_STYLE_INTENSITY: u8 = 10;
pub const DEFAULT_STYLE_INTENSITY: u8 = 7;

/// Documented guidance range of the backend model.
pub const GUIDANCE_SCALE_MIN: f64 = 3.0;
pub const GUIDANCE_SCALE_MAX: f64 = 7.0;

/// Parameters sent to the remote generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackendParams {
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
}

impl BackendParams {
    pub fn from_knobs(quality: Option<&str>, style_intensity: Option<i64>) -> Self {
        Self {
            num_inference_steps: inference_steps(quality),
            guidance_scale: guidance_scale(style_intensity_or_default(style_intensity)),
        }
    }
}

/// Look up the step count for a quality selector.
pub fn inference_steps(quality: Option<&str>) -> u32 {
    quality
        .and_then(|q| {
            QUALITY_STEPS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(q.trim()))
        })
        .map(|(_, steps)| *steps)
        .unwrap_or(DEFAULT_INFERENCE_STEPS)
}

/// Accept intensities in `1..=10`, anything else becomes the default.
pub fn style_intensity_or_default(raw: Option<i64>) -> u8 {
    match raw {
        Some(v) if (MIN_STYLE_INTENSITY as i64..=MAX_STYLE_INTENSITY as i64).contains(&v) => {
            v as u8
        }
        _ => DEFAULT_STYLE_INTENSITY,
    }
}

/// Linear map of `1..=10` onto the guidance range, rounded to one decimal.
pub fn guidance_scale(intensity: u8) -> f64 {
    let intensity = intensity.clamp(MIN_STYLE_INTENSITY, MAX_STYLE_INTENSITY);
    let fraction = f64::from(intensity - MIN_STYLE_INTENSITY)
        / f64::from(MAX_STYLE_INTENSITY - MIN_STYLE_INTENSITY);
    let scale = GUIDANCE_SCALE_MIN + fraction * (GUIDANCE_SCALE_MAX - GUIDANCE_SCALE_MIN);
    (scale * 10.0).round() / 10.0
}
