//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed category catalog (`Status`, `ItemType`, country and month tables)
//! - record shapes for training rows, validated orders and inference input
//! - run configuration (`TrainConfig`, `SampleConfig`, `OutlierColumn`)

pub mod catalog;
pub mod types;

pub use catalog::*;
pub use types::*;
