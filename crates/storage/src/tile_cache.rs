//! Disk cache of rendered tiles.
//!
//! Tiles live at
//!
//! ```text
//! {root}/network/{network_id}/{z}/{x}/{y}.png
//! {root}/gateway/{network_id}/{gateway_id}/{z}/{x}/{y}.png
//! ```
//!
//! with identifiers percent-encoded. Entries are never deleted; whether one
//! may be served is decided on read from its modification time and a
//! per-zoom freshness window.
//!
//! Writes go to a temporary file in the target directory which is then
//! renamed over the entry, so concurrent writers need no lock and readers
//! never see a partially written tile.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use coverage_common::{CoverageError, CoverageResult, Scope, TileAddress};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const MINUTE: u64 = 60;

/// Mode of stored tiles, readable by other users and front-end servers.
#[cfg(unix)]
const TILE_FILE_MODE: u32 = 0o644;
const HOUR: u64 = 60 * MINUTE;

/// Tile cache settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCacheConfig {
    /// Scales every freshness window.
    pub freshness_multiplier: f64,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            freshness_multiplier: 1.0,
        }
    }
}

/// How long a tile at `zoom` stays fresh.
///
/// Coarse zooms aggregate large areas and change slowly; the finest zooms
/// are never considered fresh.
pub fn freshness_window(zoom: u32) -> Duration {
    let secs = match zoom {
        18.. => 0,
        16..=17 => 10 * MINUTE,
        14..=15 => HOUR,
        12..=13 => 2 * HOUR,
        10..=11 => 4 * HOUR,
        8..=9 => 8 * HOUR,
        6..=7 => 10 * HOUR,
        5 => 12 * HOUR,
        _ => 24 * HOUR,
    };
    Duration::from_secs(secs)
}

/// Whether an entry of the given age is stale at `zoom`.
pub fn is_stale(zoom: u32, age: Duration, multiplier: f64) -> bool {
    let window = freshness_window(zoom);
    if window.is_zero() {
        return true;
    }
    // A window too large for a Duration never expires.
    match Duration::try_from_secs_f64(window.as_secs_f64() * multiplier.max(0.0)) {
        Ok(scaled) => age > scaled,
        Err(_) => false,
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheLookup {
    /// A decodable tile exists for the address.
    pub found: bool,
    /// The tile is older than its freshness window.
    pub stale: bool,
    pub bytes: Option<Bytes>,
    pub modified: Option<SystemTime>,
}

impl CacheLookup {
    fn miss() -> Self {
        Self::default()
    }

    /// Found and fresh.
    pub fn is_servable(&self) -> bool {
        self.found && !self.stale
    }
}

/// Disk cache rooted at one directory, used for one tile style.
#[derive(Debug, Clone)]
pub struct TileCache {
    root: PathBuf,
    config: TileCacheConfig,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>, config: TileCacheConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TileCacheConfig {
        &self.config
    }

    /// Create the root directory. Called once at startup.
    pub fn ensure_root(&self) -> CoverageResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            CoverageError::Cache(format!(
                "Failed to create cache directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// File path of the entry for `address`.
    pub fn path_for(&self, address: &TileAddress) -> PathBuf {
        let mut path = self.root.clone();
        match &address.scope {
            Scope::Network { network_id } => {
                path.push("network");
                path.push(urlencoding::encode(network_id).as_ref());
            }
            Scope::Gateway {
                network_id,
                gateway_id,
            } => {
                path.push("gateway");
                path.push(urlencoding::encode(network_id).as_ref());
                path.push(urlencoding::encode(gateway_id).as_ref());
            }
        }
        path.push(address.coord.z.to_string());
        path.push(address.coord.x.to_string());
        path.push(format!("{}.png", address.coord.y));
        path
    }

    /// Read the entry for `address` and judge its freshness.
    ///
    /// A missing file and a file that does not decode as PNG are both
    /// reported as not found.
    pub async fn lookup(&self, address: &TileAddress) -> CoverageResult<CacheLookup> {
        let path = self.path_for(address);
        let zoom = address.coord.z;
        let multiplier = self.config.freshness_multiplier;

        run_blocking(move || lookup_file(&path, zoom, multiplier)).await
    }

    /// Write `bytes` as the entry for `address`, replacing any existing one.
    ///
    /// Returns the modification time of the written entry.
    pub async fn store(&self, address: &TileAddress, bytes: Bytes) -> CoverageResult<SystemTime> {
        let path = self.path_for(address);
        run_blocking(move || store_file(&path, &bytes)).await
    }
}

async fn run_blocking<T, F>(f: F) -> CoverageResult<T>
where
    F: FnOnce() -> CoverageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoverageError::Internal(format!("Cache task failed: {}", e)))?
}

fn lookup_file(path: &Path, zoom: u32, multiplier: f64) -> CoverageResult<CacheLookup> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheLookup::miss()),
        Err(e) => {
            return Err(CoverageError::Cache(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            )))
        }
    };

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheLookup::miss()),
        Err(e) => {
            return Err(CoverageError::Cache(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    if let Err(e) = image::load_from_memory_with_format(&data, image::ImageFormat::Png) {
        warn!(path = %path.display(), error = %e, "Cached tile does not decode, treating as miss");
        return Ok(CacheLookup::miss());
    }

    let modified = metadata.modified().ok();
    let age = modified
        .and_then(|m| SystemTime::now().duration_since(m).ok())
        .unwrap_or(Duration::ZERO);
    let stale = is_stale(zoom, age, multiplier);

    debug!(path = %path.display(), age_secs = age.as_secs(), stale, "Tile cache hit");

    Ok(CacheLookup {
        found: true,
        stale,
        bytes: Some(Bytes::from(data)),
        modified,
    })
}

fn store_file(path: &Path, bytes: &[u8]) -> CoverageResult<SystemTime> {
    let dir = path
        .parent()
        .ok_or_else(|| CoverageError::Cache(format!("No parent directory for {}", path.display())))?;

    std::fs::create_dir_all(dir).map_err(|e| {
        CoverageError::Cache(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        CoverageError::Cache(format!("Failed to create temp file in {}: {}", dir.display(), e))
    })?;
    tmp.write_all(bytes)
        .map_err(|e| CoverageError::Cache(format!("Failed to write tile: {}", e)))?;

    // Temp files are created owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(TILE_FILE_MODE))
            .map_err(|e| CoverageError::Cache(format!("Failed to set tile permissions: {}", e)))?;
    }

    let file = tmp.persist(path).map_err(|e| {
        CoverageError::Cache(format!("Failed to move tile into {}: {}", path.display(), e.error))
    })?;

    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now());

    debug!(path = %path.display(), size = bytes.len(), "Stored tile");
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_common::{TileCoord, TileStyle};

    #[test]
    fn test_freshness_window_steps() {
        assert_eq!(freshness_window(19), Duration::ZERO);
        assert_eq!(freshness_window(18), Duration::ZERO);
        assert_eq!(freshness_window(17), Duration::from_secs(600));
        assert_eq!(freshness_window(14), Duration::from_secs(3600));
        assert_eq!(freshness_window(12), Duration::from_secs(2 * 3600));
        assert_eq!(freshness_window(10), Duration::from_secs(4 * 3600));
        assert_eq!(freshness_window(8), Duration::from_secs(8 * 3600));
        assert_eq!(freshness_window(6), Duration::from_secs(10 * 3600));
        assert_eq!(freshness_window(5), Duration::from_secs(12 * 3600));
        assert_eq!(freshness_window(4), Duration::from_secs(24 * 3600));
        assert_eq!(freshness_window(0), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_freshness_window_never_grows_with_zoom() {
        for zoom in 0..19 {
            assert!(freshness_window(zoom) >= freshness_window(zoom + 1));
        }
    }

    #[test]
    fn test_is_stale() {
        let day = Duration::from_secs(24 * 3600);
        assert!(is_stale(2, day + Duration::from_secs(3600), 1.0));
        assert!(!is_stale(2, day - Duration::from_secs(3600), 1.0));
        assert!(!is_stale(2, day + Duration::from_secs(3600), 2.0));
        assert!(is_stale(18, Duration::ZERO, 1.0));
        assert!(is_stale(19, Duration::ZERO, 100.0));
    }

    #[test]
    fn test_huge_multiplier_never_stale() {
        let ten_years = Duration::from_secs(10 * 365 * 24 * 3600);
        assert!(!is_stale(2, ten_years, 1e20));
        assert!(!is_stale(17, ten_years, f64::MAX));
        assert!(is_stale(18, ten_years, 1e20));
    }

    #[test]
    fn test_path_layout() {
        let cache = TileCache::new("/var/cache/tms", TileCacheConfig::default());
        let coord = TileCoord::new(12, 2170, 1345).unwrap();

        let network = TileAddress::new(TileStyle::Circles, Scope::network("NS_TTS_V3://ttn@000013"), coord);
        assert_eq!(
            cache.path_for(&network),
            PathBuf::from("/var/cache/tms/network/NS_TTS_V3%3A%2F%2Fttn%40000013/12/2170/1345.png")
        );

        let gateway = TileAddress::new(TileStyle::Blocks, Scope::gateway("ttn", "eui-b827/ebff"), coord);
        assert_eq!(
            cache.path_for(&gateway),
            PathBuf::from("/var/cache/tms/gateway/ttn/eui-b827%2Febff/12/2170/1345.png")
        );
    }
}
