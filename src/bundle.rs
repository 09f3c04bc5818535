use std::collections::BTreeMap;

use crate::domain::Method;
use crate::error::TallyError;
use crate::projection::{Cell, Namespace, Projection};

/// Per-method counters for one entity. The key set is [`Method::ALL`] and never changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseBundle {
    counts: [u64; Method::ALL.len()],
}

impl DatabaseBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, method_name: &str, amount: u64) -> Result<(), TallyError> {
        let method: Method = method_name.parse()?;
        self.add(method, amount);
        Ok(())
    }

    pub fn add(&mut self, method: Method, amount: u64) {
        let slot = &mut self.counts[method.index()];
        *slot = slot.saturating_add(amount);
    }

    pub fn get(&self, method: Method) -> u64 {
        self.counts[method.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|count| *count == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Method, u64)> + '_ {
        Method::ALL
            .into_iter()
            .map(|method| (method, self.counts[method.index()]))
    }

    pub fn merge(&mut self, other: &DatabaseBundle) {
        for (method, count) in other.iter() {
            self.add(method, count);
        }
    }

    pub fn project(&self, target: &mut Projection, namespace: Namespace<'_>) {
        for (method, count) in self.iter() {
            target.push(namespace.column_name(method), Cell::Count(count));
        }
    }
}

/// Entity name to bundle, kept in insertion order so every cluster projects identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityBundles {
    entries: Vec<(String, DatabaseBundle)>,
}

impl EntityBundles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zero bundle for `name` unless one exists.
    pub fn insert(&mut self, name: &str) {
        if !self.contains(name) {
            self.entries.push((name.to_string(), DatabaseBundle::new()));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(entity, _)| entity == name)
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseBundle> {
        self.entries
            .iter()
            .find(|(entity, _)| entity == name)
            .map(|(_, bundle)| bundle)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DatabaseBundle> {
        self.entries
            .iter_mut()
            .find(|(entity, _)| entity == name)
            .map(|(_, bundle)| bundle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseBundle)> {
        self.entries
            .iter()
            .map(|(entity, bundle)| (entity.as_str(), bundle))
    }
}

/// Running per-entity sums across every cluster of a run.
#[derive(Debug, Clone, Default)]
pub struct EntityTotals {
    bundles: EntityBundles,
}

impl EntityTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a cluster's bundles; entities that were never hit are not added.
    pub fn merge(&mut self, bundles: &EntityBundles) {
        for (entity, bundle) in bundles.iter() {
            if bundle.is_zero() {
                continue;
            }
            self.bundles.insert(entity);
            if let Some(total) = self.bundles.get_mut(entity) {
                total.merge(bundle);
            }
        }
    }

    pub fn get(&self, entity: &str) -> Option<&DatabaseBundle> {
        self.bundles.get(entity)
    }

    pub fn to_summary(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        self.bundles
            .iter()
            .map(|(entity, bundle)| {
                let per_method = bundle
                    .iter()
                    .map(|(method, count)| (method.as_str().to_string(), count))
                    .collect();
                (entity.to_string(), per_method)
            })
            .collect()
    }
}
