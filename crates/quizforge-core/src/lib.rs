//! quizforge-core: contour grading engine and exam variant generator.
//!
//! This crate holds the geometry kernel, shape metrics, the weighted
//! scorer, the grading orchestrator and the constrained variant generator,
//! plus the configuration, loaders and reports built around them. All of
//! it is synchronous and free of shared state.

pub mod config;
pub mod error;
pub mod geometry;
pub mod grading;
pub mod metrics;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod variants;
