//! # voxconv-pipeline
//!
//! Orchestration layer of voxconv:
//!
//! - [`ConversionPipeline`]: load → middleware chain → dump over a
//!   [`voxconv_workspace::VirtualWorkspace`]
//! - [`Wizard`]: the per-session step machine driving the pipeline
//! - [`PipelineMetrics`]: counters and duration percentiles

pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod wizard;

pub use error::{ConvertError, WizardError};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{
    BatchItem, BatchReport, ConversionPipeline, ConversionReport, ConversionRequest,
    MiddlewareStep,
};
pub use wizard::{ConversionOutcome, Session, Wizard, WizardState, WizardStep};
