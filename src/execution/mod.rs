//! Pipeline orchestration

pub mod chart;
pub mod engine;

pub use chart::{ChartUpdateOutcome, ChartUpdateRequest, ChartUpdater, ChartValues};
pub use engine::{Clock, EngineSettings, EventHandler, PipelineEngine, PipelineEvent};
