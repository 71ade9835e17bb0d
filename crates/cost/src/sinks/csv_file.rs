//! Delimited text output of aggregated points.
//!
//! Rows are plain comma-joined fields with no quoting, matching what the
//! downstream spreadsheets expect.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use tracing::debug;

use super::SinkError;
use crate::aggregate::Points;

/// Column headers, in output order.
pub const HEADERS: [&str; 12] = [
    "SubscriptionID",
    "Subscription",
    "MeterID",
    "MeterCategory",
    "MeterSubCategory",
    "ResourceGroup",
    "Resource",
    "BillPeriod",
    "Quantity",
    "Cost",
    "Month",
    "Day",
];

/// Writes points as CSV rows to any writer.
pub struct CsvWriter<W: Write> {
    inner: Writer<W>,
    rows: usize,
}

impl CsvWriter<File> {
    /// Create (or truncate) the output file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), "Creating CSV output");
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> CsvWriter<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        let inner = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        Self { inner, rows: 0 }
    }

    /// Write the header line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_header(&mut self) -> Result<(), SinkError> {
        self.inner.write_record(HEADERS)?;
        Ok(())
    }

    /// Append one row per point and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn write_points(&mut self, points: &Points) -> Result<(), SinkError> {
        for point in points.values() {
            let quantity = format!("{:.6}", point.quantity);
            let cost = format!("{:.6}", point.cost);
            let month = point.month().to_string();
            let day = point.day().to_string();
            self.inner.write_record([
                point.subscription_id.as_str(),
                point.subscription.as_str(),
                point.meter_id.as_str(),
                point.meter_category.as_str(),
                point.meter_sub_category.as_str(),
                point.resource_group.as_str(),
                point.resource.as_str(),
                point.bill_period.as_str(),
                quantity.as_str(),
                cost.as_str(),
                month.as_str(),
                day.as_str(),
            ])?;
            self.rows += 1;
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Data rows written so far.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.inner
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}
