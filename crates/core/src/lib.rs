//! Core library: VRM license extraction, reports, mapping files and input scanning.

pub mod config;
pub mod error;
pub mod extractor;
pub mod mapping;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod scanner;

pub use error::{DecodeError, Error, Result};
