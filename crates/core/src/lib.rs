//! Domain types and pure policy for the video generation job lifecycle.
//!
//! Nothing in this crate performs I/O. The job record, its merge rules,
//! the progress normalizer, backend parameter mapping and artifact naming
//! all live here so the pipeline, persistence and HTTP layers agree on them.

pub mod artifact;
pub mod error;
pub mod job;
pub mod params;
pub mod progress;
pub mod prompt;
pub mod types;
