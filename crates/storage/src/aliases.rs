//! Configuration-time aliases between network identifiers.
//!
//! Some networks were historically stored under more than one identifier.
//! A request for one identifier queries all of its aliases as well.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Map from a requested network id to the extra ids stored for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkAliases(HashMap<String, Vec<String>>);

impl NetworkAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `alias` as an extra identifier for `network_id`.
    pub fn insert(&mut self, network_id: impl Into<String>, alias: impl Into<String>) {
        let aliases = self.0.entry(network_id.into()).or_default();
        let alias = alias.into();
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }

    /// The identifiers to query for `network_id`, requested id first.
    pub fn expand(&self, network_id: &str) -> Vec<String> {
        let mut ids = vec![network_id.to_string()];
        if let Some(aliases) = self.0.get(network_id) {
            for alias in aliases {
                if !ids.contains(alias) {
                    ids.push(alias.clone());
                }
            }
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for NetworkAliases {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut aliases = Self::new();
        for (network_id, alias) in iter {
            aliases.insert(network_id, alias);
        }
        aliases
    }
}
