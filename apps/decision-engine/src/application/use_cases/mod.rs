//! Application Use Cases

mod run_pipeline;

pub use run_pipeline::RunPipelineUseCase;
