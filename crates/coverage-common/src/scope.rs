//! Tile styles, request scopes and tile addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoverageError;
use crate::tile::TileCoord;

/// Visual style of a coverage tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileStyle {
    /// Overlapping filled circles on a 3x3 working canvas.
    Circles,
    /// Axis-aligned filled squares, one per grid cell.
    Blocks,
}

impl TileStyle {
    /// Path segment used in URLs and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            TileStyle::Circles => "circles",
            TileStyle::Blocks => "blocks",
        }
    }
}

impl fmt::Display for TileStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileStyle {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circles" => Ok(TileStyle::Circles),
            "blocks" => Ok(TileStyle::Blocks),
            other => Err(CoverageError::invalid(
                "style",
                format!("unknown style '{}'", other),
            )),
        }
    }
}

/// Which transceivers a tile aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scope {
    /// Every live transceiver of one network.
    Network { network_id: String },
    /// The transceivers of a single gateway, live or not.
    Gateway {
        network_id: String,
        gateway_id: String,
    },
}

impl Scope {
    pub fn network(network_id: impl Into<String>) -> Self {
        Scope::Network {
            network_id: network_id.into(),
        }
    }

    pub fn gateway(network_id: impl Into<String>, gateway_id: impl Into<String>) -> Self {
        Scope::Gateway {
            network_id: network_id.into(),
            gateway_id: gateway_id.into(),
        }
    }

    pub fn network_id(&self) -> &str {
        match self {
            Scope::Network { network_id } | Scope::Gateway { network_id, .. } => network_id,
        }
    }

    pub fn gateway_id(&self) -> Option<&str> {
        match self {
            Scope::Network { .. } => None,
            Scope::Gateway { gateway_id, .. } => Some(gateway_id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Scope::Network { .. } => "network",
            Scope::Gateway { .. } => "gateway",
        }
    }
}

/// The tuple identifying one renderable and cacheable tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    pub style: TileStyle,
    pub scope: Scope,
    pub coord: TileCoord,
}

impl TileAddress {
    pub fn new(style: TileStyle, scope: Scope, coord: TileCoord) -> Self {
        Self {
            style,
            scope,
            coord,
        }
    }

    /// Whether the shared tile cache may serve or hold this tile.
    ///
    /// Gateway tiles are always regenerated and never stored.
    pub fn is_cacheable(&self) -> bool {
        matches!(self.scope, Scope::Network { .. })
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Scope::Network { network_id } => write!(
                f,
                "{}/network/{}/{}",
                self.style,
                network_id,
                self.coord.cache_key()
            ),
            Scope::Gateway {
                network_id,
                gateway_id,
            } => write!(
                f,
                "{}/gateway/{}/{}/{}",
                self.style,
                network_id,
                gateway_id,
                self.coord.cache_key()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_round_trip() {
        assert_eq!("circles".parse::<TileStyle>().unwrap(), TileStyle::Circles);
        assert_eq!("blocks".parse::<TileStyle>().unwrap(), TileStyle::Blocks);
        assert!("heatmap".parse::<TileStyle>().is_err());
    }

    #[test]
    fn test_scope_accessors() {
        let network = Scope::network("thethingsnetwork.org");
        assert_eq!(network.network_id(), "thethingsnetwork.org");
        assert_eq!(network.gateway_id(), None);

        let gateway = Scope::gateway("NS_TTS_V3://ttn@000013", "eui-60c5a8fffe761551");
        assert_eq!(gateway.network_id(), "NS_TTS_V3://ttn@000013");
        assert_eq!(gateway.gateway_id(), Some("eui-60c5a8fffe761551"));
        assert_eq!(gateway.kind(), "gateway");
    }

    #[test]
    fn test_only_network_tiles_are_cacheable() {
        let coord = TileCoord::new(14, 9050, 9835).unwrap();
        let network = TileAddress::new(TileStyle::Circles, Scope::network("ttn"), coord);
        let gateway = TileAddress::new(TileStyle::Circles, Scope::gateway("ttn", "gw1"), coord);
        assert!(network.is_cacheable());
        assert!(!gateway.is_cacheable());
    }

    #[test]
    fn test_display() {
        let coord = TileCoord::new(12, 2170, 1345).unwrap();
        let address = TileAddress::new(TileStyle::Blocks, Scope::gateway("ttn", "gw1"), coord);
        assert_eq!(address.to_string(), "blocks/gateway/ttn/gw1/12/2170/1345");
    }
}
