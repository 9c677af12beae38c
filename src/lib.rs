//! zepp-fit - Rebuilds Zepp sport history exports as FIT activity messages
//!
//! Zepp devices upload each activity as a summary of aggregate statistics plus
//! a detail record of sparse, delta-encoded metric strings. This crate turns
//! that pair into a dense per-second timeline and maps it onto the message
//! set of a single-lap FIT activity file:
//! delta decoding → window resolution → container assembly → export mapping
//! → output sink.
//!
//! ## Modules
//!
//! - **decoder / window**: delta-series decoding over a resolved time window
//! - **container**: per-second reconciliation of every metric
//! - **mapper**: sport-specific FIT message synthesis
//! - **sink**: destinations for converted activities

pub mod config;
pub mod container;
pub mod decoder;
pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod sport;
pub mod types;
pub mod window;

pub use config::{ConverterConfig, DeviceIdentity, UnsupportedPolicy};
pub use container::SportContainerBuilder;
pub use error::ConvertError;
pub use mapper::{ExportMapper, ExportOutcome};
pub use pipeline::{category_counts, convert, decode, BatchReport, Converter, FailedActivity};
pub use sink::{JsonDocumentSink, MemorySink, OutputSink};
pub use sport::SportCategory;
pub use types::{FitMessage, Sample, SportContainer};

// Schema exports
pub use schema::{
    ExportAdapter, ExportDirectory, PageSource, RawActivityDetail, RawActivitySummary,
    SummaryPages,
};

/// Crate version embedded in every output document
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Product name stamped into device info and output documents
pub const PRODUCT_NAME: &str = "zepp-fit-extractor";
