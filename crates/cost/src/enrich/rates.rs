//! Rate-card pricing of usage records.

use std::collections::HashMap;

use tracing::debug;

use crate::usage::{Meter, UsageRecord};

/// Counts from a pricing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSummary {
    /// Records whose meter was found on the rate card.
    pub priced: usize,
    /// Records with a meter missing from the rate card.
    pub unknown_meter: usize,
}

/// Set each record's effective rate to `base rate * multiplier`.
///
/// Writes only `properties.rate`. Records with an unknown meter keep their
/// current rate (zero for freshly fetched records) and so contribute no cost.
pub fn apply_rates(
    records: &mut [UsageRecord],
    meters: &HashMap<String, Meter>,
    multiplier: f64,
) -> RateSummary {
    let mut summary = RateSummary::default();

    for record in records.iter_mut() {
        let Some(meter) = meters.get(&record.properties.meter_id) else {
            debug!(meter_id = %record.properties.meter_id, "Meter not on rate card");
            summary.unknown_meter += 1;
            continue;
        };

        record.properties.rate = meter.base_rate() * multiplier;
        summary.priced += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RecordBuilder;

    fn meters(entries: &[(&str, f64)]) -> HashMap<String, Meter> {
        entries
            .iter()
            .map(|(id, rate)| {
                let meter = Meter {
                    meter_id: (*id).to_string(),
                    meter_rates: HashMap::from([("0".to_string(), *rate)]),
                    ..Default::default()
                };
                ((*id).to_string(), meter)
            })
            .collect()
    }

    #[test]
    fn test_rate_is_base_rate_times_multiplier() {
        let mut records = vec![RecordBuilder::new().meter("M1").build()];

        let summary = apply_rates(&mut records, &meters(&[("M1", 2.0)]), 1.25);

        assert!((records[0].properties.rate - 2.5).abs() < f64::EPSILON);
        assert_eq!(summary.priced, 1);
    }

    #[test]
    fn test_unknown_meter_keeps_zero_rate() {
        let mut records = vec![RecordBuilder::new().meter("missing").quantity(1000.0).build()];

        let summary = apply_rates(&mut records, &meters(&[("M1", 2.0)]), 1.0);

        assert!(records[0].properties.rate.abs() < f64::EPSILON);
        assert_eq!(summary.unknown_meter, 1);
    }

    #[test]
    fn test_meter_without_base_tier_prices_at_zero() {
        let mut tiered = HashMap::new();
        tiered.insert(
            "M1".to_string(),
            Meter {
                meter_id: "M1".to_string(),
                meter_rates: HashMap::from([("100".to_string(), 3.0)]),
                ..Default::default()
            },
        );
        let mut records = vec![RecordBuilder::new().meter("M1").rate(9.0).build()];

        apply_rates(&mut records, &tiered, 1.0);

        assert!(records[0].properties.rate.abs() < f64::EPSILON);
    }
}
