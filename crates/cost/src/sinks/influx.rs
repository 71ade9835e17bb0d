//! InfluxDB 1.x writer using the HTTP line protocol.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{MetricsSink, SinkError};
use crate::aggregate::{Point, Points};
use crate::config::Config;

/// Write precision; timestamps are sent as whole hours since the epoch.
const PRECISION: &str = "h";

const SECONDS_PER_HOUR: i64 = 3600;

/// Writes points to an InfluxDB database, one batch per call.
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: Client,
    write_url: Url,
    measurement: String,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxWriter {
    /// Create a writer for the configured host, database and measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        let base = config.influx_host.trim_end_matches('/');
        let write_url = Url::parse_with_params(
            &format!("{base}/write"),
            &[("db", config.influx_db.as_str()), ("precision", PRECISION)],
        )
        .map_err(|e| SinkError::Config(format!("invalid influxHost {base}: {e}")))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            write_url,
            measurement: config.influx_measurement.clone(),
            username: config.influx_username.clone(),
            password: config.influx_password.clone(),
        })
    }

    /// Render points as line protocol, one line per point.
    ///
    /// Points with a non-finite quantity or cost are skipped.
    #[must_use]
    pub fn render(&self, points: &Points) -> String {
        let mut body = String::new();
        for point in points.values() {
            if !point.quantity.is_finite() || !point.cost.is_finite() {
                warn!(
                    meter_id = %point.meter_id,
                    resource = %point.resource,
                    "Skipping point with non-finite values"
                );
                continue;
            }
            self.render_point(&mut body, point);
        }
        body
    }

    fn render_point(&self, out: &mut String, point: &Point) {
        out.push_str(&escape_measurement(&self.measurement));
        for (key, value) in &point.tags {
            if value.is_empty() {
                continue;
            }
            let _ = write!(out, ",{}={}", escape_key(key), escape_key(value));
        }
        let hours = point.timestamp.timestamp().div_euclid(SECONDS_PER_HOUR);
        let _ = writeln!(
            out,
            " Cost={:?},Quantity={:?} {hours}",
            point.cost, point.quantity
        );
    }
}

#[async_trait]
impl MetricsSink for InfluxWriter {
    #[instrument(skip_all, fields(points = points.len()))]
    async fn write_points(&self, points: &Points) -> Result<usize, SinkError> {
        let body = self.render(points);
        let lines = body.lines().count();
        if lines == 0 {
            debug!("No points to write");
            return Ok(0);
        }

        let mut request = self.client.post(self.write_url.clone()).body(body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(lines, "Wrote points");
        Ok(lines)
    }
}

/// Escape a measurement name.
fn escape_measurement(value: &str) -> String {
    escape(value, &[',', ' '])
}

/// Escape a tag key, tag value or field key.
fn escape_key(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

/// Backslash-escape `special`. Line breaks cannot be escaped in line
/// protocol and are written as spaces, which are then escaped.
fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let c = if matches!(c, '\n' | '\r') { ' ' } else { c };
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::fixtures::{tags, RecordBuilder};
    use crate::usage::Tags;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(host: &str) -> Config {
        serde_json::from_value(json!({
            "tenantId": "tenant-1",
            "subscription": "Production",
            "subscriptionId": "S1",
            "clientId": "client-1",
            "clientSecret": "secret-1",
            "influxHost": host,
            "influxDB": "costs",
            "influxMeasurement": "azure cost",
            "influxUsername": "writer",
            "influxPassword": "pw"
        }))
        .unwrap()
    }

    fn points() -> Points {
        let defaults = BTreeMap::from([("Environment".to_string(), "prod".to_string())]);
        let aggregator = Aggregator::new("Production", "unknown", ChronoDuration::zero(), &defaults);
        aggregator.aggregate(&[RecordBuilder::new()
            .resource("RG1", "web server,1", tags(&[("Environment", "staging")]))
            .quantity(2.0)
            .rate(1.5)
            .build()])
    }

    #[test]
    fn test_render_line_protocol() {
        let writer = InfluxWriter::new(&config("http://localhost:8086")).unwrap();
        let body = writer.render(&points());

        // 2024-01-05T01:00:00Z
        let hours = 1_704_416_400 / 3600;
        assert_eq!(
            body,
            format!(
                "azure\\ cost,BillPeriod=2024-01,MeterCategory=C,MeterID=M1,MeterSubCategory=SC,\
                 Resource=web\\ server\\,1,ResourceGroup=RG1,Subscription=Production,SubscriptionID=S1,\
                 _Environment=staging Cost=3.0,Quantity=2.0 {hours}\n"
            )
        );
    }

    #[test]
    fn test_render_skips_empty_tag_values() {
        let writer = InfluxWriter::new(&config("http://localhost:8086")).unwrap();
        let defaults = BTreeMap::new();
        let aggregator = Aggregator::new("Production", "unknown", ChronoDuration::zero(), &defaults);
        let points = aggregator.aggregate(&[RecordBuilder::new().build()]);

        let body = writer.render(&points);
        assert!(!body.contains("Resource="));
        assert!(!body.contains("ResourceGroup="));
        assert!(body.contains("MeterID=M1"));
    }

    #[test]
    fn test_render_keeps_line_breaks_out_of_tags() {
        let writer = InfluxWriter::new(&config("http://localhost:8086")).unwrap();
        let defaults = BTreeMap::from([("Owner\nTeam".to_string(), "ops".to_string())]);
        let aggregator = Aggregator::new("Production", "unknown", ChronoDuration::zero(), &defaults);
        let points = aggregator.aggregate(&[
            RecordBuilder::new()
                .resource("RG1", "R1", tags(&[("Owner\nTeam", "first\r\nsecond")]))
                .build(),
            RecordBuilder::new()
                .resource("RG1", "R2", Tags::new())
                .build(),
        ]);

        let body = writer.render(&points);

        assert_eq!(body.lines().count(), 2);
        assert!(body.contains(",_Owner\\ Team=first\\ \\ second "));
        assert!(body.contains(",_Owner\\ Team=ops "));
    }

    #[test]
    fn test_invalid_host_rejected() {
        let err = InfluxWriter::new(&config("not a url")).unwrap_err();
        assert!(matches!(err, SinkError::Config(_)));
    }

    #[tokio::test]
    async fn test_write_points_posts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/write"))
            .and(query_param("db", "costs"))
            .and(query_param("precision", "h"))
            .and(header_exists("Authorization"))
            .and(body_string_contains("_Environment=staging"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let writer = InfluxWriter::new(&config(&server.uri())).unwrap();
        let written = writer.write_points(&points()).await.unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_write_points_empty_batch_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let writer = InfluxWriter::new(&config(&server.uri())).unwrap();
        assert_eq!(writer.write_points(&Points::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_points_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/write"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"database not found: \"costs\""}"#))
            .mount(&server)
            .await;

        let writer = InfluxWriter::new(&config(&server.uri())).unwrap();
        let err = writer.write_points(&points()).await.unwrap_err();
        assert!(matches!(err, SinkError::Api { status: 404, .. }));
    }
}
