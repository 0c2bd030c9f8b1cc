//! The correction controller and the outcomes it reports.

pub mod outcome;
pub mod pipeline;

pub use outcome::{
    CorrectedOutcome, CorrectionAttempt, ErrorKind, OutcomeTag, PipelineOutcome, QueryReport,
    ReportedError,
};
pub use pipeline::QueryPipeline;
