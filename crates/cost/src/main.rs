//! Cloud cost CLI - extract Azure usage into CSV and InfluxDB.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate, Utc};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloud_cost::{Azure, BillingProvider, Config, CsvWriter, DateRange, Extractor, InfluxWriter};

/// Days past today included in the default range, so late usage is picked up.
const FORWARD_DAYS: u64 = 2;

/// Cloud cost extractor - daily Azure usage to CSV and InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "cloud-cost")]
#[command(about = "Extract Azure usage costs into CSV and InfluxDB")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, env = "CLOUD_COST_CONFIG")]
    config: PathBuf,

    /// First day to extract (YYYY-MM-DD)
    #[arg(long, requires = "to_date")]
    from_date: Option<NaiveDate>,

    /// Day after the last day to extract (YYYY-MM-DD)
    #[arg(long, requires = "from_date")]
    to_date: Option<NaiveDate>,

    /// Days before today to start from when no dates are given
    #[arg(long, default_value_t = 5)]
    days_back: u32,

    /// Directory for the CSV output
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Range of days to extract, relative to `today` unless given explicitly.
    fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        match (self.from_date, self.to_date) {
            (Some(from), Some(to)) => {
                if to < from {
                    bail!("--to-date {to} is before --from-date {from}");
                }
                Ok(DateRange::new(from, to))
            }
            _ => {
                let start = today
                    .checked_sub_days(Days::new(u64::from(self.days_back)))
                    .with_context(|| format!("--days-back {} reaches before the earliest date", self.days_back))?;
                let end = today
                    .checked_add_days(Days::new(FORWARD_DAYS))
                    .with_context(|| format!("{today} is too close to the latest date"))?;
                Ok(DateRange::new(start, end))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "cloud_cost=debug,info"
    } else {
        "cloud_cost=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Err(e) = run(cli).await {
        error!(error = format!("{e:#}"), "Extraction failed");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let range = cli.date_range(Utc::now().date_naive())?;
    info!(from = %range.start, to = %range.end, days = range.len(), "Extraction range");

    info!(path = %cli.config.display(), "Loading configuration");
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    info!(subscription = %config.subscription, "Connecting to Azure");
    let azure = Azure::connect(&config)
        .await
        .context("Failed to authenticate with Azure")?;

    let groups = azure
        .get_groups()
        .await
        .context("Failed to load resource groups")?;
    info!(groups = groups.len(), "Loaded resource groups");

    let influx = InfluxWriter::new(&config).context("Failed to create InfluxDB writer")?;

    let csv_path = config.csv_path(&cli.output_dir);
    let mut csv = CsvWriter::create(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    info!(subscription = %config.subscription, csv = %csv_path.display(), "Extracting costs");
    let summary = Extractor::new(&azure, &influx, &config, &groups)
        .run(range, &mut csv)
        .await?;

    info!(
        days = summary.days,
        records = summary.records,
        points = summary.points,
        retries = summary.retries,
        rows = csv.rows(),
        "Extraction complete"
    );
    Ok(())
}
