//! Day-by-day extraction loop.
//!
//! For each calendar day in the range: fetch usage, resolve tags, price,
//! aggregate, then append to the CSV output and push to the metrics sink.
//! Days run strictly one after another and the first error ends the run.

use std::collections::HashMap;
use std::io::Write;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{count_by_category, totals};
use crate::config::Config;
use crate::enrich::{apply_rates, resolve_tags};
use crate::providers::{BillingProvider, BillingProviderError};
use crate::sinks::{CsvWriter, MetricsSink, SinkError};
use crate::usage::{Group, Meter, UsageRecord};

/// Errors that end an extraction run.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The billing provider failed.
    #[error("billing provider error: {0}")]
    Provider(#[from] BillingProviderError),

    /// Writing output failed.
    #[error("output error: {0}")]
    Sink(#[from] SinkError),
}

/// Half-open range of calendar days, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range. An `end` at or before `start` yields no days.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The days in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }

    /// Number of days in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from((self.end - self.start).num_days()).unwrap_or(0)
    }

    /// Whether the range contains no days.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Days processed.
    pub days: usize,
    /// Usage records fetched.
    pub records: usize,
    /// Points written.
    pub points: usize,
    /// Days that needed a second fetch.
    pub retries: usize,
}

/// Drives one extraction run against a provider and a metrics sink.
pub struct Extractor<'a, P: ?Sized, S: ?Sized> {
    provider: &'a P,
    sink: &'a S,
    config: &'a Config,
    groups: &'a HashMap<String, Group>,
}

impl<'a, P, S> Extractor<'a, P, S>
where
    P: BillingProvider + ?Sized,
    S: MetricsSink + ?Sized,
{
    /// Create an extractor. `groups` are the subscription's resource groups
    /// keyed by name, loaded once by the caller.
    #[must_use]
    pub fn new(
        provider: &'a P,
        sink: &'a S,
        config: &'a Config,
        groups: &'a HashMap<String, Group>,
    ) -> Self {
        Self {
            provider,
            sink,
            config,
            groups,
        }
    }

    /// Run the extraction over `range`, writing the CSV header first.
    ///
    /// # Errors
    ///
    /// Returns the first provider or output error; later days are not
    /// processed.
    pub async fn run<W: Write>(
        &self,
        range: DateRange,
        csv: &mut CsvWriter<W>,
    ) -> Result<ExtractSummary, ExtractError> {
        csv.write_header()?;

        let meters = self.provider.get_meters().await?;
        info!(
            provider = self.provider.name(),
            meters = meters.len(),
            "Loaded rate card"
        );

        let mut summary = ExtractSummary::default();
        for day in range.days() {
            self.extract_day(day, &meters, csv, &mut summary).await?;
            summary.days += 1;
        }

        Ok(summary)
    }

    async fn extract_day<W: Write>(
        &self,
        day: NaiveDate,
        meters: &HashMap<String, Meter>,
        csv: &mut CsvWriter<W>,
        summary: &mut ExtractSummary,
    ) -> Result<(), ExtractError> {
        let start = midnight(day);
        let end = start + Duration::days(1);

        let mut records = self.fetch(day, start, end, summary).await?;

        let resolution = resolve_tags(&mut records, self.groups, &self.config.tag_defaults);
        debug!(
            filled = resolution.filled(),
            from_group = resolution.from_group,
            from_default = resolution.from_default,
            skipped = resolution.skipped_records,
            "Resolved tags"
        );

        let rates = apply_rates(&mut records, meters, self.config.rate_multiply);
        if rates.unknown_meter > 0 {
            warn!(
                day = %day,
                unknown = rates.unknown_meter,
                "Records with meters missing from the rate card"
            );
        }

        let points = self.config.aggregator().aggregate(&records);
        csv.write_points(&points)?;
        let written = self.sink.write_points(&points).await?;

        let (quantity, cost) = totals(&points);
        debug!(day = %day, categories = ?count_by_category(&points), "Points by meter category");
        info!(
            day = %day,
            records = records.len(),
            points = points.len(),
            written,
            quantity,
            cost,
            "Processed day"
        );

        summary.records += records.len();
        summary.points += points.len();
        Ok(())
    }

    /// Fetch one day's records, asking once more if the first answer is empty.
    async fn fetch(
        &self,
        day: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        summary: &mut ExtractSummary,
    ) -> Result<Vec<UsageRecord>, ExtractError> {
        let records = self.provider.get_readings(start, end).await?;
        if !records.is_empty() {
            return Ok(records);
        }

        warn!(day = %day, "No usage records returned, retrying once");
        summary.retries += 1;
        let records = self.provider.get_readings(start, end).await?;
        if records.is_empty() {
            warn!(day = %day, "Still no usage records, continuing with an empty day");
        }
        Ok(records)
    }
}

/// Midnight UTC at the start of `day`.
#[must_use]
pub fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}
