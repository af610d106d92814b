//! Shared test utilities for noteocr integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a real pipeline to an in-memory database
//! - Scripted OCR engines and failing stores for fault injection

pub mod fakes;
pub mod harness;

pub use fakes::{FailingDocumentStore, Gate, Script, ScriptedEngine};
pub use harness::TestHarness;
