//! Common test fixtures for coverage tests.

use chrono::{DateTime, Duration, Utc};
use coverage_common::{BucketCounts, GridCell, SignalBucket};

/// Network identifiers seen in production.
pub mod networks {
    pub const TTN_V3: &str = "NS_TTS_V3://ttn@000013";
    pub const TTN_V2: &str = "thethingsnetwork";
    pub const EXAMPLE: &str = "foo.example";
}

/// Tiles used across tests.
pub mod tiles {
    /// Base-zoom tile with a single grid cell (10, 10).
    pub const BASE: (u32, u32, u32) = (19, 10, 10);

    /// Zoom 12 tile over Wolfsburg.
    pub const CITY: (u32, u32, u32) = (12, 2170, 1345);

    /// Whole world.
    pub const WORLD: (u32, u32, u32) = (0, 0, 0);
}

/// Counters with a single positive bucket.
pub fn counts(bucket: SignalBucket, count: i64) -> BucketCounts {
    BucketCounts::default().with(bucket, count)
}

/// A transceiver's cell with a single positive bucket.
pub fn cell(antenna_id: i64, x: i64, y: i64, bucket: SignalBucket, count: i64) -> GridCell {
    GridCell::new(Some(antenna_id), x, y, counts(bucket, count))
}

/// Timestamp `hours` in the past.
pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

/// Timestamp `days` in the past.
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_fixture() {
        let c = cell(1, 10, 10, SignalBucket::High, 3);
        assert_eq!(c.counts.total(), 3);
        assert_eq!(c.to_sample().bucket, 0);
    }

    #[test]
    fn test_time_fixtures_are_in_the_past() {
        assert!(hours_ago(1) < Utc::now());
        assert!(days_ago(6) < hours_ago(1));
    }
}
