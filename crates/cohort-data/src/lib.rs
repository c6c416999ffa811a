//! Data layer for cohort analytics.
//!
//! Reads session exports, validates and normalizes them, computes the
//! engagement aggregates and per-threshold survival curves, and runs the
//! end-to-end analysis pipeline. Also generates synthetic fixtures.

pub mod aggregator;
pub mod analysis;
pub mod loader;
pub mod normalizer;
pub mod reader;
pub mod retention;
pub mod synthetic;

pub use cohort_core as core;
