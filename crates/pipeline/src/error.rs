use genesis_core::types::JobId;

/// Errors returned synchronously by job queries and commands.
///
/// Failures inside a background run never surface here; they are
/// recorded on the job instead.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {0} has not completed")]
    NotReady(JobId),

    #[error("Artifact for job {0} is missing")]
    ArtifactMissing(JobId),

    #[error("Job {0} has already finished")]
    AlreadyTerminal(JobId),
}
