// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod error;

pub mod config;
pub mod ingest;

// Scoring and the numeric stages
pub mod aggregate;
pub mod align;
pub mod analyze;
pub mod prices;
pub mod trend;

pub mod pipeline;

// HTTP surface
pub mod api;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::{Result, SentimentError};
pub use crate::ingest::{HeadlineRecord, NewsSource};
pub use crate::pipeline::{run, AnalysisReport, Collaborators, PipelineConfig, Preset};
