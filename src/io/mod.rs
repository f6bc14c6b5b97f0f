//! Input/output helpers.
//!
//! - dataset and order CSV ingest (`ingest`)
//! - dataset CSV export (`export`)
//! - model bundle read/write (`bundle`)

pub mod bundle;
pub mod export;
pub mod ingest;

pub use bundle::*;
pub use export::*;
pub use ingest::*;
