//! Plugin-contributed change attributes.
//!
//! A [`PluginRegistry`] holds the [`ContributionFactory`] instances registered
//! at startup. For every batch of changes being formatted the registry asks
//! each factory, in registration order, for its attributes and collects them
//! into a list-multimap keyed by change id. Duplicates and insertion order
//! are preserved.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use critic_core::{ChangeId, ChangeState};

/// Attributes contributed by one plugin for one change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDefinedInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl PluginDefinedInfo {
    /// Placeholder recorded when a factory fails.
    pub fn failure(plugin: &str) -> Self {
        PluginDefinedInfo {
            name: plugin.to_string(),
            message: Some(format!("Something went wrong in plugin: {plugin}")),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Error raised by a contribution factory.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PluginError(pub String);

/// Per-change contributions keyed by change id.
pub type Contributions = IndexMap<ChangeId, Vec<PluginDefinedInfo>>;

/// Produces plugin attributes for a batch of changes.
pub trait ContributionFactory: Send + Sync {
    /// Name reported in every contribution of this factory.
    fn plugin_name(&self) -> &str;

    /// Returns `(change, attributes)` pairs. A change may receive several
    /// entries or none.
    fn create(
        &self,
        changes: &[ChangeState],
    ) -> Result<Vec<(ChangeId, serde_json::Map<String, serde_json::Value>)>, PluginError>;
}

/// The set of contribution factories known to the server.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    factories: Vec<Arc<dyn ContributionFactory>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn register(&mut self, factory: Arc<dyn ContributionFactory>) {
        self.factories.push(factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Queries every factory for `changes`.
    ///
    /// A failing factory does not fail the request: it is logged and every
    /// change in the batch receives a [`PluginDefinedInfo::failure`] entry
    /// for that plugin.
    pub fn create_all(&self, changes: &[ChangeState]) -> Contributions {
        let mut out = Contributions::new();
        for factory in &self.factories {
            let name = factory.plugin_name();
            match factory.create(changes) {
                Ok(entries) => {
                    for (change, attributes) in entries {
                        out.entry(change).or_default().push(PluginDefinedInfo {
                            name: name.to_string(),
                            message: None,
                            attributes,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(plugin = name, error = %err, "contribution factory failed");
                    for change in changes {
                        out.entry(change.id)
                            .or_default()
                            .push(PluginDefinedInfo::failure(name));
                    }
                }
            }
        }
        out
    }
}

/// Built-in factory reporting a size bucket for the current patch set.
pub struct ChangeSizeFactory;

impl ChangeSizeFactory {
    pub const NAME: &'static str = "change-size";

    /// Bucket for a number of changed lines.
    pub fn bucket(lines: u32) -> &'static str {
        match lines {
            0..=9 => "XS",
            10..=49 => "S",
            50..=249 => "M",
            250..=999 => "L",
            _ => "XL",
        }
    }
}

impl ContributionFactory for ChangeSizeFactory {
    fn plugin_name(&self) -> &str {
        Self::NAME
    }

    fn create(
        &self,
        changes: &[ChangeState],
    ) -> Result<Vec<(ChangeId, serde_json::Map<String, serde_json::Value>)>, PluginError> {
        Ok(changes
            .iter()
            .filter_map(|change| {
                let ps = change.current_patch_set()?;
                let lines = ps.insertions().saturating_add(ps.deletions());
                let mut attributes = serde_json::Map::new();
                attributes.insert("size".into(), Self::bucket(lines).into());
                attributes.insert("lines".into(), lines.into());
                Some((change.id, attributes))
            })
            .collect())
    }
}
