//! Progress normalization for free-form remote status lines.
//!
//! The generation backend reports progress as log text ("step 15/20",
//! "42%", "Loading weights..."). [`normalize`] turns each line into a
//! 0-100 estimate that is monotonic against the previous value.
//!
//! Parsed signals are mapped onto the [`STEP_RANGE_START`]..[`STEP_RANGE_END`]
//! sub-range; the rest of the scale belongs to submission (below) and
//! artifact download (above). Text without recognizable structure means
//! "still working": progress creeps forward by [`IDLE_INCREMENT`] but
//! never past [`IDLE_CEILING`], so it cannot overtake a real signal.
//! Failure is never inferred from text.

use std::sync::LazyLock;

use regex::Regex;

/// Progress reported once the remote call is accepted.
pub const STEP_RANGE_START: f64 = 20.0;
/// Highest progress a parsed remote signal can produce.
pub const STEP_RANGE_END: f64 = 90.0;
/// Increment applied for activity without a parseable signal.
pub const IDLE_INCREMENT: u8 = 2;
/// Idle increments stop here.
pub const IDLE_CEILING: u8 = 80;

/// `current/total`, e.g. `step 15/20` or `15 / 20`.
static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("valid regex"));

/// Bare percentage, e.g. `42%` or `42.5 %`.
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid regex"));

/// Compute the next progress value from the last known one and a status line.
///
/// The result is always `>= last` and `<= 100`.
pub fn normalize(last: u8, status_line: &str) -> u8 {
    let last = last.min(100);
    match estimate(status_line) {
        Some(estimate) => last.max(estimate.round() as u8),
        None if last < IDLE_CEILING => (last + IDLE_INCREMENT).min(IDLE_CEILING),
        None => last,
    }
}

/// Parse a status line into a position on the step sub-range.
///
/// The step pattern takes priority over the percentage pattern.
pub fn estimate(status_line: &str) -> Option<f64> {
    if let Some(caps) = STEP_RE.captures(status_line) {
        let current: f64 = caps[1].parse().ok()?;
        let total: f64 = caps[2].parse().ok()?;
        if total > 0.0 {
            return Some(scale(current / total));
        }
    }

    let caps = PERCENT_RE.captures(status_line)?;
    let percent: f64 = caps[1].parse().ok()?;
    Some(scale(percent / 100.0))
}

fn scale(fraction: f64) -> f64 {
    STEP_RANGE_START + fraction.clamp(0.0, 1.0) * (STEP_RANGE_END - STEP_RANGE_START)
}
