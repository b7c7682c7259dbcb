//! The asynchronous job lifecycle.
//!
//! A [`JobOrchestrator`] accepts a prompt, records a queued [`Job`], and
//! drives it in a background task through prompt enhancement, the remote
//! generation call and the artifact download. State lives in a
//! [`JobStore`], which can rebuild records for jobs it no longer holds in
//! memory.
//!
//! [`Job`]: genesis_core::job::Job

pub mod enhance;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod store;

pub use enhance::{DisabledEnhancer, EnhanceOutcome, OpenAiEnhancer, PromptEnhancer};
pub use error::JobError;
pub use fetcher::{ArtifactFetcher, FetchError};
pub use orchestrator::{JobOrchestrator, OrchestratorConfig, SubmitOptions};
pub use store::JobStore;
