//! Read-only access to the aggregated grid cells in PostgreSQL.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coverage_common::{
    BucketCounts, CoverageError, CoverageResult, CoverageStore, GridCell, LastHeardSource, SignalBucket,
    TileRange,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;

/// Grid cell store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgCoverageStore {
    pool: PgPool,
}

impl PgCoverageStore {
    /// Connect to the database at `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> CoverageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| CoverageError::Database(format!("Connection failed: {}", e)))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check the database answers.
    pub async fn ping(&self) -> CoverageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CoverageError::Database(format!("Ping failed: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct GridCellRow {
    antenna_id: Option<i64>,
    x: i64,
    y: i64,
    bucket_high: i64,
    bucket100: i64,
    bucket105: i64,
    bucket110: i64,
    bucket115: i64,
    bucket120: i64,
    bucket125: i64,
    bucket130: i64,
    bucket135: i64,
    bucket140: i64,
    bucket145: i64,
    bucket_low: i64,
    bucket_no_signal: i64,
}

impl From<GridCellRow> for GridCell {
    fn from(row: GridCellRow) -> Self {
        let counts = BucketCounts([
            row.bucket_high,
            row.bucket100,
            row.bucket105,
            row.bucket110,
            row.bucket115,
            row.bucket120,
            row.bucket125,
            row.bucket130,
            row.bucket135,
            row.bucket140,
            row.bucket145,
            row.bucket_low,
            row.bucket_no_signal,
        ]);
        GridCell::new(row.antenna_id, row.x, row.y, counts)
    }
}

/// `SUM(gc.<bucket>)::bigint AS <bucket>` for every bucket column.
fn bucket_sums() -> String {
    SignalBucket::ALL
        .iter()
        .map(|b| format!("SUM(gc.{col})::bigint AS {col}", col = b.column()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn network_cells_sql() -> String {
    format!(
        "SELECT gc.antenna_id::bigint AS antenna_id, gc.x::bigint AS x, gc.y::bigint AS y, {} \
         FROM grid_cells gc \
         JOIN antennas a ON a.id = gc.antenna_id \
         WHERE a.network_id = ANY($1) \
           AND gc.x >= $2 AND gc.x < $3 AND gc.y >= $4 AND gc.y < $5 \
         GROUP BY gc.antenna_id, gc.x, gc.y",
        bucket_sums()
    )
}

fn gateway_cells_sql() -> String {
    format!(
        "SELECT NULL::bigint AS antenna_id, gc.x::bigint AS x, gc.y::bigint AS y, {} \
         FROM grid_cells gc \
         JOIN antennas a ON a.id = gc.antenna_id \
         WHERE a.network_id = ANY($1) AND a.gateway_id = $2 \
           AND gc.x >= $3 AND gc.x < $4 AND gc.y >= $5 AND gc.y < $6 \
         GROUP BY gc.x, gc.y",
        bucket_sums()
    )
}

const LAST_HEARD_SQL: &str = "SELECT g.last_heard FROM antennas a \
     JOIN gateways g ON a.gateway_id = g.gateway_id AND a.network_id = g.network_id \
     WHERE a.id = $1";

#[async_trait]
impl CoverageStore for PgCoverageStore {
    async fn network_cells(
        &self,
        network_ids: &[String],
        range: &TileRange,
    ) -> CoverageResult<Vec<GridCell>> {
        let rows = sqlx::query_as::<_, GridCellRow>(&network_cells_sql())
            .bind(network_ids)
            .bind(range.x_min)
            .bind(range.x_max)
            .bind(range.y_min)
            .bind(range.y_max)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoverageError::Database(format!("Network query failed: {}", e)))?;

        Ok(rows.into_iter().map(GridCell::from).collect())
    }

    async fn gateway_cells(
        &self,
        network_ids: &[String],
        gateway_id: &str,
        range: &TileRange,
    ) -> CoverageResult<Vec<GridCell>> {
        let rows = sqlx::query_as::<_, GridCellRow>(&gateway_cells_sql())
            .bind(network_ids)
            .bind(gateway_id)
            .bind(range.x_min)
            .bind(range.x_max)
            .bind(range.y_min)
            .bind(range.y_max)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoverageError::Database(format!("Gateway query failed: {}", e)))?;

        Ok(rows.into_iter().map(GridCell::from).collect())
    }
}

#[async_trait]
impl LastHeardSource for PgCoverageStore {
    async fn antenna_last_heard(&self, antenna_id: i64) -> CoverageResult<Option<DateTime<Utc>>> {
        let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(LAST_HEARD_SQL)
            .bind(antenna_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoverageError::Database(format!("Last heard query failed: {}", e)))?;

        Ok(row.and_then(|(last_heard,)| last_heard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_sums_cover_every_column_in_order() {
        let sums = bucket_sums();
        assert!(sums.starts_with("SUM(gc.bucket_high)::bigint AS bucket_high"));
        assert!(sums.ends_with("SUM(gc.bucket_no_signal)::bigint AS bucket_no_signal"));
        assert_eq!(sums.matches("SUM(").count(), 13);
    }

    #[test]
    fn test_range_bounds_are_half_open() {
        let sql = network_cells_sql();
        assert!(sql.contains("gc.x >= $2 AND gc.x < $3"));
        assert!(sql.contains("GROUP BY gc.antenna_id, gc.x, gc.y"));

        let sql = gateway_cells_sql();
        assert!(sql.contains("a.gateway_id = $2"));
        assert!(sql.contains("GROUP BY gc.x, gc.y"));
    }

    #[test]
    fn test_row_maps_buckets_by_strength() {
        let row = GridCellRow {
            antenna_id: Some(4),
            x: 10,
            y: 11,
            bucket_high: 3,
            bucket100: 0,
            bucket105: 0,
            bucket110: 0,
            bucket115: 0,
            bucket120: 0,
            bucket125: 0,
            bucket130: 0,
            bucket135: 0,
            bucket140: 0,
            bucket145: 0,
            bucket_low: 1,
            bucket_no_signal: 2,
        };
        let cell = GridCell::from(row);
        assert_eq!(cell.antenna_id, Some(4));
        assert_eq!(cell.counts.get(SignalBucket::High), 3);
        assert_eq!(cell.counts.get(SignalBucket::Low), 1);
        assert_eq!(cell.counts.get(SignalBucket::NoSignal), 2);
        assert_eq!(cell.to_sample().bucket, 0);
    }
}
