//! Folio - ranked search over a digitized book archive
//!
//! Each query runs twice against the search engine: once over book titles and
//! descriptions, once over page text. The two hit lists are fused, rescored by
//! highlighted-term density, and capped per category. An offline harness grades
//! rankings against curated expectations and keeps a history of runs.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod history;
pub mod interactions;
pub mod normalize;
pub mod query;
pub mod retrieval;
pub mod service;

pub use error::{FolioError, Result};
