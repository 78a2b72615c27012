//! Shared test utilities for pobatch integration tests.
//!
//! This module provides:
//! - Builders for pricing rules, orders and uploads
//! - `ScriptedExtractor` whose progress is driven step by step from the test
//! - `PipelineHarness` wrapping a pipeline with its event stream

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{PipelineHarness, RejectingSink, ScriptedExtractor, SlowSink, Step};
