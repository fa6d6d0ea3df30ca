// LogSlicer - core/mod.rs
//
// Core engines: classification, segmentation, concatenation, audit,
// checksum and packaging.
// Must NOT depend on: app, platform, or any configuration/CLI concern.

pub mod audit;
pub mod checksum;
pub mod classifier;
pub mod concat;
pub mod model;
pub mod package;
pub mod sanitize;
pub mod scan;
pub mod segment;
