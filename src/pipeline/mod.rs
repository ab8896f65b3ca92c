//! Full-run control: execution, validation, and fix cycles.

pub mod controller;

pub use controller::{PipelineConfig, PipelineController, PipelineResult};
