#![forbid(unsafe_code)]

//! Core library for ambulatory blood pressure monitoring (ABPM) analysis.
//!
//! This crate provides:
//! - Hemodynamic indices computed from blood pressure and heart rate
//! - Domain types (patient measurements, ABPM test records)
//! - Clinical API client and batched puller
//! - On-disk record store and dataset assembly

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod hemodynamics;
pub mod client;
pub mod puller;
pub mod store;
pub mod dataset;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use hemodynamics::{HemodynamicIndex, HemodynamicProfile};
pub use client::{AbpmClient, AbpmSource};
pub use puller::{pull, PullOptions, PullReport, StopReason};
pub use store::{JsonRecordStore, RecordSink};
pub use dataset::{build_dataset, DatasetRow, DatasetSummary};
