//! In-memory grid cell store.
//!
//! Implements both store traits over plain collections, counts calls and
//! can be told to fail, so tests can check caching and error paths without
//! a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coverage_common::{
    BucketCounts, CoverageError, CoverageResult, CoverageStore, GridCell, LastHeardSource, TileRange,
};

/// A transceiver and the gateway it belongs to.
#[derive(Debug, Clone)]
pub struct AntennaRecord {
    pub network_id: String,
    pub gateway_id: String,
    /// When the owning gateway was last heard, `None` if never.
    pub last_heard: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
    antennas: RwLock<HashMap<i64, AntennaRecord>>,
    cells: RwLock<Vec<GridCell>>,
    fail_queries: AtomicBool,
    fail_liveness: AtomicBool,
    network_calls: AtomicUsize,
    gateway_calls: AtomicUsize,
    liveness_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_antenna(
        &self,
        antenna_id: i64,
        network_id: &str,
        gateway_id: &str,
        last_heard: Option<DateTime<Utc>>,
    ) {
        self.antennas.write().unwrap().insert(
            antenna_id,
            AntennaRecord {
                network_id: network_id.to_string(),
                gateway_id: gateway_id.to_string(),
                last_heard,
            },
        );
    }

    /// Add a cell. `cell.antenna_id` must name a known antenna to be found.
    pub fn add_cell(&self, cell: GridCell) {
        self.cells.write().unwrap().push(cell);
    }

    /// Make grid cell queries fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Make last-heard lookups fail.
    pub fn set_fail_liveness(&self, fail: bool) {
        self.fail_liveness.store(fail, Ordering::SeqCst);
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    pub fn gateway_calls(&self) -> usize {
        self.gateway_calls.load(Ordering::SeqCst)
    }

    pub fn liveness_calls(&self) -> usize {
        self.liveness_calls.load(Ordering::SeqCst)
    }

    fn matching_cells<F>(&self, range: &TileRange, keep: F) -> Vec<(i64, GridCell)>
    where
        F: Fn(&AntennaRecord) -> bool,
    {
        let antennas = self.antennas.read().unwrap();
        self.cells
            .read()
            .unwrap()
            .iter()
            .filter(|c| range.contains(c.x, c.y))
            .filter_map(|c| {
                let id = c.antenna_id?;
                antennas.get(&id).filter(|a| keep(*a)).map(|_| (id, c.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl CoverageStore for MemoryStore {
    async fn network_cells(
        &self,
        network_ids: &[String],
        range: &TileRange,
    ) -> CoverageResult<Vec<GridCell>> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(CoverageError::Database("injected query failure".into()));
        }

        let mut grouped: BTreeMap<(i64, i64, i64), BucketCounts> = BTreeMap::new();
        for (id, cell) in self.matching_cells(range, |a| network_ids.contains(&a.network_id)) {
            grouped.entry((id, cell.x, cell.y)).or_default().merge(&cell.counts);
        }

        Ok(grouped
            .into_iter()
            .map(|((id, x, y), counts)| GridCell::new(Some(id), x, y, counts))
            .collect())
    }

    async fn gateway_cells(
        &self,
        network_ids: &[String],
        gateway_id: &str,
        range: &TileRange,
    ) -> CoverageResult<Vec<GridCell>> {
        self.gateway_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(CoverageError::Database("injected query failure".into()));
        }

        let mut grouped: BTreeMap<(i64, i64), BucketCounts> = BTreeMap::new();
        let keep = |a: &AntennaRecord| network_ids.contains(&a.network_id) && a.gateway_id == gateway_id;
        for (_, cell) in self.matching_cells(range, keep) {
            grouped.entry((cell.x, cell.y)).or_default().merge(&cell.counts);
        }

        Ok(grouped
            .into_iter()
            .map(|((x, y), counts)| GridCell::new(None, x, y, counts))
            .collect())
    }
}

#[async_trait]
impl LastHeardSource for MemoryStore {
    async fn antenna_last_heard(&self, antenna_id: i64) -> CoverageResult<Option<DateTime<Utc>>> {
        self.liveness_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_liveness.load(Ordering::SeqCst) {
            return Err(CoverageError::Database("injected liveness failure".into()));
        }
        Ok(self
            .antennas
            .read()
            .unwrap()
            .get(&antenna_id)
            .and_then(|a| a.last_heard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{cell, hours_ago};
    use coverage_common::SignalBucket;

    fn ids(id: &str) -> Vec<String> {
        vec![id.to_string()]
    }

    #[tokio::test]
    async fn test_network_cells_grouped_per_antenna() {
        let store = MemoryStore::new();
        store.add_antenna(1, "net", "gw1", Some(hours_ago(1)));
        store.add_antenna(2, "net", "gw2", None);
        store.add_antenna(3, "other", "gw3", None);
        store.add_cell(cell(1, 5, 5, SignalBucket::High, 1));
        store.add_cell(cell(1, 5, 5, SignalBucket::High, 2));
        store.add_cell(cell(2, 5, 5, SignalBucket::Low, 4));
        store.add_cell(cell(3, 5, 5, SignalBucket::Low, 4));
        store.add_cell(cell(1, 50, 50, SignalBucket::Low, 4));

        let range = TileRange::new(0, 0, 10, 10);
        let cells = store.network_cells(&ids("net"), &range).await.unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].antenna_id, Some(1));
        assert_eq!(cells[0].counts.get(SignalBucket::High), 3);
        assert_eq!(store.network_calls(), 1);
    }

    #[tokio::test]
    async fn test_gateway_cells_summed() {
        let store = MemoryStore::new();
        store.add_antenna(1, "net", "gw1", None);
        store.add_antenna(2, "net", "gw1", None);
        store.add_cell(cell(1, 5, 5, SignalBucket::High, 1));
        store.add_cell(cell(2, 5, 5, SignalBucket::High, 2));

        let cells = store
            .gateway_cells(&ids("net"), "gw1", &TileRange::new(0, 0, 10, 10))
            .await
            .unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].antenna_id, None);
        assert_eq!(cells[0].counts.get(SignalBucket::High), 3);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.set_fail_queries(true);
        store.set_fail_liveness(true);
        assert!(store.network_cells(&ids("net"), &TileRange::new(0, 0, 1, 1)).await.is_err());
        assert!(store.antenna_last_heard(1).await.is_err());
    }
}
