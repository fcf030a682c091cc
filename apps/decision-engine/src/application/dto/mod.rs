//! Data Transfer Objects (DTOs)
//!
//! Use case inputs and outputs.

mod pipeline_dto;

pub use pipeline_dto::{PipelineReport, RunPipelineRequest, SubmissionSummary};
