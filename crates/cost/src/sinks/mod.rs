//! Output sinks for aggregated points.
//!
//! - [`CsvWriter`] - comma-separated rows, one file per run
//! - [`InfluxWriter`] - InfluxDB line protocol over HTTP

mod csv_file;
mod influx;

use async_trait::async_trait;
use thiserror::Error;

use crate::aggregate::Points;

pub use csv_file::{CsvWriter, HEADERS};
pub use influx::InfluxWriter;

/// Errors that can occur while writing points.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The metrics store rejected the write.
    #[error("write rejected: {status} - {message}")]
    Api { status: u16, message: String },

    /// Invalid sink configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A time-series store that accepts batches of points.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Write one batch, returning the number of points sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be delivered.
    async fn write_points(&self, points: &Points) -> Result<usize, SinkError>;
}
