// LogSlicer - app/mod.rs
//
// Application layer: run orchestration and background job management.
// Dependencies: core and platform layers.

pub mod job;
pub mod pipeline;
