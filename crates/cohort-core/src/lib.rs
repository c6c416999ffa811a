//! Shared building blocks for cohort analytics.
//!
//! Typed session records and the fixed feature set, the error type, run
//! settings, timestamp parsing and the Kaplan-Meier estimator.

pub mod error;
pub mod models;
pub mod settings;
pub mod survival;
pub mod time_utils;

pub use error::{InsightError, Result};
