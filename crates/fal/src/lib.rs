//! Remote generation client for the Fal queue API.
//!
//! [`provider`] defines the boundary the job pipeline consumes (the
//! [`GenerationClient`] trait and its request/outcome types),
//! [`messages`] holds the queue wire format, and [`api`] implements the
//! trait over Fal's REST endpoints with [`reqwest`].

pub mod api;
pub mod messages;
pub mod provider;

pub use api::{FalClient, FalConfig};
pub use provider::{
    GenerationClient, GenerationOutput, GenerationRequest, ProgressSender, QueueStatus,
    QueueUpdate, RemoteError,
};
