//! Content-addressed photo and video ingestion.
//!
//! Files found in a growing source tree are hashed, deduplicated against a
//! persistent identity index and copied exactly once into a date-partitioned
//! archive, placed by the capture date in their EXIF metadata.

pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod placement;
pub mod platform;
pub mod scanner;
pub mod storage;
pub mod transfer;

pub use config::AppConfig;
pub use engine::{Daemon, Running};
pub use error::{Error, Result};
pub use hasher::ContentHash;
pub use metadata::CapturedDate;
pub use pipeline::{JobOutcome, Pipeline, PipelineMode};
pub use placement::Placement;
pub use storage::{IdentityIndex, RecordOutcome};
