//! Artifact naming and content-type tables.
//!
//! Artifacts live under a fixed output root as `{job_id}.{extension}`.
//! The name is also the reconstruction key, so the fetcher and the
//! reconstruction lookup share [`ARTIFACT_EXTENSIONS`].

use std::path::{Path, PathBuf};

use crate::types::JobId;

/// Extensions tried, in order, when rebuilding a job from disk.
pub const ARTIFACT_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];

/// Extension used when the declared type gives nothing better.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Content type assumed when the backend declares none.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix of the filename offered to downloading clients.
pub const DOWNLOAD_NAME_PREFIX: &str = "neural_genesis_";

/// Derive a file extension from a declared content type.
///
/// Priority: `mp4`, `webm`, `mov`/`quicktime` by substring; a generic
/// `octet-stream` is an mp4; anything else uses its subtype token with
/// `x-matroska` corrected to `mkv`.
pub fn extension_for_content_type(content_type: &str) -> String {
    let content_type = content_type.trim().to_ascii_lowercase();

    if content_type.contains("mp4") {
        return "mp4".to_string();
    }
    if content_type.contains("webm") {
        return "webm".to_string();
    }
    if content_type.contains("mov") || content_type.contains("quicktime") {
        return "mov".to_string();
    }
    if content_type.contains("octet-stream") {
        return DEFAULT_EXTENSION.to_string();
    }

    let subtype = content_type
        .split_once('/')
        .map(|(_, rest)| rest.split(';').next().unwrap_or("").trim())
        .filter(|s| s.starts_with(|c: char| c.is_ascii_alphanumeric()) && s.chars().all(is_token_char));

    match subtype {
        Some("x-matroska") => "mkv".to_string(),
        Some(subtype) => subtype.to_string(),
        None => DEFAULT_EXTENSION.to_string(),
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+')
}

/// `{job_id}.{extension}`
pub fn artifact_file_name(job_id: JobId, extension: &str) -> String {
    format!("{job_id}.{extension}")
}

/// Full artifact path under `root`.
pub fn artifact_path(root: &Path, job_id: JobId, extension: &str) -> PathBuf {
    root.join(artifact_file_name(job_id, extension))
}

/// Public retrieval handle for a job's artifact.
pub fn artifact_url(job_id: JobId) -> String {
    format!("/api/download/{job_id}")
}

/// Extension of a path, lower-cased, or the default.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Content type to serve an artifact with, from its extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "video/mp4",
    }
}

/// Filename offered in `Content-Disposition`.
pub fn download_file_name(job_id: JobId, extension: &str) -> String {
    format!("{DOWNLOAD_NAME_PREFIX}{job_id}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_video_types() {
        assert_eq!(extension_for_content_type("video/mp4"), "mp4");
        assert_eq!(extension_for_content_type("video/webm; codecs=vp9"), "webm");
        assert_eq!(extension_for_content_type("video/quicktime"), "mov");
        assert_eq!(extension_for_content_type("VIDEO/MP4"), "mp4");
    }

    #[test]
    fn octet_stream_defaults_to_mp4() {
        assert_eq!(extension_for_content_type("application/octet-stream"), "mp4");
    }

    #[test]
    fn matroska_is_corrected_to_mkv() {
        assert_eq!(
            extension_for_content_type("video/x-matroska; codecs=\"avc1\""),
            "mkv"
        );
    }

    #[test]
    fn other_types_use_their_subtype() {
        assert_eq!(extension_for_content_type("video/avi"), "avi");
        assert_eq!(extension_for_content_type("video/x-flv;charset=binary"), "x-flv");
    }

    #[test]
    fn unusable_types_fall_back_to_default() {
        assert_eq!(extension_for_content_type(""), "mp4");
        assert_eq!(extension_for_content_type("garbage"), "mp4");
        assert_eq!(extension_for_content_type("video/../../x"), "mp4");
    }

    #[test]
    fn artifact_names_are_addressable_by_id() {
        let id = crate::types::new_job_id();
        let path = artifact_path(Path::new("/out"), id, "webm");
        assert_eq!(path, PathBuf::from(format!("/out/{id}.webm")));
        assert_eq!(extension_of(&path), "webm");
        assert_eq!(artifact_url(id), format!("/api/download/{id}"));
        assert_eq!(
            download_file_name(id, "mp4"),
            format!("neural_genesis_{id}.mp4")
        );
    }

    #[test]
    fn serving_content_type_defaults_to_mp4() {
        assert_eq!(content_type_for_extension("webm"), "video/webm");
        assert_eq!(content_type_for_extension("mp4"), "video/mp4");
        assert_eq!(content_type_for_extension("xyz"), "video/mp4");
    }
}
