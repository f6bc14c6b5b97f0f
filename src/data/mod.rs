//! Dataset sources: a seeded synthetic generator and an HTTP download.

pub mod download;
pub mod sample;

pub use download::download_dataset;
pub use sample::generate_dataset;
