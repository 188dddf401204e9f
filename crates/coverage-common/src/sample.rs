//! Aggregated grid cells and their reduction to a dominant signal bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bucket index used when no signal bucket dominates.
pub const NO_SIGNAL_BUCKET: u8 = 12;

/// Signal strength classes, strongest first.
///
/// The discriminant is the bucket index used for classification and
/// colouring. Numbered buckets are named after their RSSI threshold in -dBm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignalBucket {
    High = 0,
    Dbm100 = 1,
    Dbm105 = 2,
    Dbm110 = 3,
    Dbm115 = 4,
    Dbm120 = 5,
    Dbm125 = 6,
    Dbm130 = 7,
    Dbm135 = 8,
    Dbm140 = 9,
    Dbm145 = 10,
    Low = 11,
    NoSignal = 12,
}

impl SignalBucket {
    /// All buckets in strength order.
    pub const ALL: [SignalBucket; 13] = [
        SignalBucket::High,
        SignalBucket::Dbm100,
        SignalBucket::Dbm105,
        SignalBucket::Dbm110,
        SignalBucket::Dbm115,
        SignalBucket::Dbm120,
        SignalBucket::Dbm125,
        SignalBucket::Dbm130,
        SignalBucket::Dbm135,
        SignalBucket::Dbm140,
        SignalBucket::Dbm145,
        SignalBucket::Low,
        SignalBucket::NoSignal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name of this bucket in the `grid_cells` table.
    pub fn column(self) -> &'static str {
        match self {
            SignalBucket::High => "bucket_high",
            SignalBucket::Dbm100 => "bucket100",
            SignalBucket::Dbm105 => "bucket105",
            SignalBucket::Dbm110 => "bucket110",
            SignalBucket::Dbm115 => "bucket115",
            SignalBucket::Dbm120 => "bucket120",
            SignalBucket::Dbm125 => "bucket125",
            SignalBucket::Dbm130 => "bucket130",
            SignalBucket::Dbm135 => "bucket135",
            SignalBucket::Dbm140 => "bucket140",
            SignalBucket::Dbm145 => "bucket145",
            SignalBucket::Low => "bucket_low",
            SignalBucket::NoSignal => "bucket_no_signal",
        }
    }
}

/// Sample counters per signal bucket, indexed by [`SignalBucket`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts(pub [i64; 13]);

impl BucketCounts {
    pub fn get(&self, bucket: SignalBucket) -> i64 {
        self.0[bucket.index()]
    }

    pub fn set(&mut self, bucket: SignalBucket, count: i64) {
        self.0[bucket.index()] = count;
    }

    /// Builder-style setter.
    pub fn with(mut self, bucket: SignalBucket, count: i64) -> Self {
        self.set(bucket, count);
        self
    }

    /// Add another cell's counters into this one.
    pub fn merge(&mut self, other: &BucketCounts) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine += theirs;
        }
    }

    pub fn total(&self) -> i64 {
        self.0.iter().sum()
    }
}

/// One base-zoom cell, either for a single transceiver or summed across
/// several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Transceiver the counters belong to; `None` for cross-transceiver sums.
    pub antenna_id: Option<i64>,
    pub x: i64,
    pub y: i64,
    pub counts: BucketCounts,
    pub last_updated: Option<DateTime<Utc>>,
}

impl GridCell {
    pub fn new(antenna_id: Option<i64>, x: i64, y: i64, counts: BucketCounts) -> Self {
        Self {
            antenna_id,
            x,
            y,
            counts,
            last_updated: None,
        }
    }

    /// Reduce this cell to a renderable sample.
    pub fn to_sample(&self) -> Sample {
        Sample {
            x: self.x,
            y: self.y,
            bucket: classify(self),
        }
    }
}

/// A grid cell reduced to its dominant bucket. Lives for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub x: i64,
    pub y: i64,
    /// Dominant bucket index, 0 (strongest) to 12 (no signal).
    pub bucket: u8,
}

impl Sample {
    pub fn new(x: i64, y: i64, bucket: u8) -> Self {
        Self {
            x,
            y,
            bucket: bucket.min(NO_SIGNAL_BUCKET),
        }
    }
}

/// Select the bucket with the largest count.
///
/// Ties go to the stronger (earlier) bucket. A signal bucket must beat the
/// no-signal count strictly, otherwise [`NO_SIGNAL_BUCKET`] is returned.
pub fn classify(cell: &GridCell) -> u8 {
    let mut max_index = NO_SIGNAL_BUCKET;
    let mut max_count = cell.counts.get(SignalBucket::NoSignal);

    for bucket in &SignalBucket::ALL[..NO_SIGNAL_BUCKET as usize] {
        let count = cell.counts.get(*bucket);
        if count > max_count {
            max_count = count;
            max_index = *bucket as u8;
        }
    }

    max_index
}
