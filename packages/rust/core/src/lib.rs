//! Pipeline orchestration, knowledge base, and reports for abstractkb.
//!
//! This crate ties together discovery, fetching, and keyword extraction into
//! a single run ([`run_pipeline`]) and owns the knowledge base it produces.

pub mod knowledge;
pub mod pipeline;
pub mod report;

pub use knowledge::KnowledgeBase;
pub use pipeline::{
    PipelineConfig, PipelineOutcome, ProgressReporter, RunSummary, SilentProgress, run_pipeline,
};
pub use report::{ReportEntry, build_report, write_full_dump, write_report};
