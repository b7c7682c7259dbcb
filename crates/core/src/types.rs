/// Jobs are addressed by a random UUID generated at submission time.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Allocate a fresh job id.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4()
}

/// Parse a client-supplied job id.
///
/// Ids double as artifact file names, so anything that is not a
/// well-formed UUID is rejected before it reaches the filesystem.
pub fn parse_job_id(raw: &str) -> Option<JobId> {
    uuid::Uuid::parse_str(raw.trim()).ok()
}
