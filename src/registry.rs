use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bundle::EntityBundles;
use crate::domain::Orientation;
use crate::error::TallyError;
use crate::fs_util;

/// On-disk shape of the amino acid name file: `{"l": [...], "d": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSets {
    #[serde(default)]
    pub l: Vec<String>,
    #[serde(default)]
    pub d: Vec<String>,
}

impl NameSets {
    pub fn names(&self, orientation: Orientation) -> &[String] {
        match orientation {
            Orientation::L => &self.l,
            Orientation::D => &self.d,
        }
    }

    pub fn contains(&self, name: &str, orientation: Orientation) -> bool {
        self.names(orientation).iter().any(|known| known == name)
    }

    /// Returns `true` when the name was not present before.
    pub fn insert(&mut self, name: &str, orientation: Orientation) -> bool {
        if self.contains(name, orientation) {
            return false;
        }
        let names = match orientation {
            Orientation::L => &mut self.l,
            Orientation::D => &mut self.d,
        };
        names.push(name.to_string());
        true
    }

    fn deduplicated(self) -> Self {
        let mut sets = NameSets::default();
        for orientation in Orientation::ALL {
            for name in self.names(orientation) {
                sets.insert(name, orientation);
            }
        }
        sets
    }
}

/// Amino acid names carried from one run to the next.
///
/// `known` is what the previous run persisted and is frozen for the lifetime of the
/// registry, because it decides the column layout of every cluster. Names seen while
/// reading annotations land in `observed`, which is what [`NameRegistry::persist`] writes.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    known: NameSets,
    observed: NameSets,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known(known: NameSets) -> Self {
        Self {
            known: known.deduplicated(),
            observed: NameSets::default(),
        }
    }

    /// Reads the previous run's names. A missing or unreadable file yields an empty registry.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!("no name registry at {}: {err}", path.display());
                return Self::new();
            }
        };
        match serde_json::from_str::<NameSets>(&content) {
            Ok(sets) => Self::with_known(sets),
            Err(err) => {
                warn!(
                    "ignoring corrupt name registry {}: {err}",
                    path.display()
                );
                Self::new()
            }
        }
    }

    pub fn known(&self, orientation: Orientation) -> &[String] {
        self.known.names(orientation)
    }

    pub fn observed(&self, orientation: Orientation) -> &[String] {
        self.observed.names(orientation)
    }

    pub fn is_known(&self, name: &str, orientation: Orientation) -> bool {
        self.known.contains(name, orientation)
    }

    /// Adds one zero bundle per known name of `orientation`.
    pub fn seed(&self, container: &mut EntityBundles, orientation: Orientation) {
        for name in self.known(orientation) {
            container.insert(name);
        }
    }

    pub fn record_observed(&mut self, name: &str, orientation: Orientation) -> bool {
        self.observed.insert(name, orientation)
    }

    /// Overwrites `path` with the names observed by this run.
    pub fn persist(&self, path: &Path) -> Result<(), TallyError> {
        let content = serde_json::to_vec(&self.observed)
            .map_err(|err| TallyError::Filesystem(err.to_string()))?;
        fs_util::write_atomic(path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let registry = NameRegistry::load(&temp.path().join("absent.json"));
        assert!(registry.known(Orientation::L).is_empty());
        assert!(registry.known(Orientation::D).is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("names.json");
        fs::write(&path, "{\"l\": [\"ala\"").unwrap();
        let registry = NameRegistry::load(&path);
        assert!(registry.known(Orientation::L).is_empty());
    }

    #[test]
    fn observation_does_not_change_seeding() {
        let mut registry = NameRegistry::with_known(NameSets {
            l: vec!["ala".to_string()],
            d: Vec::new(),
        });
        assert!(registry.record_observed("orn", Orientation::L));
        assert!(!registry.record_observed("orn", Orientation::L));

        let mut bundles = EntityBundles::new();
        registry.seed(&mut bundles, Orientation::L);
        assert_eq!(bundles.len(), 1);
        assert!(bundles.contains("ala"));
        assert_eq!(registry.observed(Orientation::L), ["orn".to_string()]);
    }

    #[test]
    fn known_names_are_deduplicated() {
        let registry = NameRegistry::with_known(NameSets {
            l: vec!["ala".to_string(), "ala".to_string(), "gly".to_string()],
            d: vec!["ala".to_string()],
        });
        assert_eq!(registry.known(Orientation::L).len(), 2);
        assert!(registry.is_known("ala", Orientation::D));
        assert!(!registry.is_known("gly", Orientation::D));
    }
}
