use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::annotation::{AnnotationReader, RawCluster};
use crate::cluster::Cluster;
use crate::domain::UnknownEntityPolicy;
use crate::error::TallyError;
use crate::fs_util;
use crate::registry::NameRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub sources_read: usize,
    pub sources_skipped: usize,
    pub directories_skipped: usize,
    pub clusters_read: usize,
    pub clusters_skipped: usize,
    pub dropped_calls: usize,
    pub dropped_smcogs: usize,
}

impl DiscoveryStats {
    pub fn absorb(&mut self, other: &DiscoveryStats) {
        self.sources_read += other.sources_read;
        self.sources_skipped += other.sources_skipped;
        self.directories_skipped += other.directories_skipped;
        self.clusters_read += other.clusters_read;
        self.clusters_skipped += other.clusters_skipped;
        self.dropped_calls += other.dropped_calls;
        self.dropped_smcogs += other.dropped_smcogs;
    }
}

/// Shared state threaded through a traversal.
pub struct Discovery<'a> {
    pub reader: &'a dyn AnnotationReader,
    pub registry: &'a mut NameRegistry,
    pub policy: UnknownEntityPolicy,
    pub stats: DiscoveryStats,
}

impl<'a> Discovery<'a> {
    pub fn new(
        reader: &'a dyn AnnotationReader,
        registry: &'a mut NameRegistry,
        policy: UnknownEntityPolicy,
    ) -> Self {
        Self {
            reader,
            registry,
            policy,
            stats: DiscoveryStats::default(),
        }
    }
}

/// Clusters found under directories that share a genus prefix, in discovery order.
#[derive(Debug, Clone)]
pub struct Genus {
    name: String,
    clusters: Vec<Cluster>,
}

impl Genus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clusters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn add_cluster(&mut self, cluster: Cluster) {
        self.clusters.push(cluster);
    }

    /// Depth-first, pre-order walk of `root`. A directory holding annotations is read
    /// and not descended into; every other subdirectory is visited in name order.
    /// Symlinked directories are not followed.
    /// Clusters are attributed to `directory_name`, the top-level batch entry.
    pub fn discover(
        &mut self,
        root: &Path,
        directory_name: &str,
        discovery: &mut Discovery<'_>,
    ) -> Result<(), TallyError> {
        if discovery.reader.is_annotation_dir(root) {
            self.read_source(root, directory_name, discovery);
            return Ok(());
        }
        let entries = match fs_util::sorted_entries(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("skipping unreadable directory: {err}");
                discovery.stats.directories_skipped += 1;
                return Ok(());
            }
        };
        for path in entries.iter().filter(|path| fs_util::is_plain_dir(path)) {
            self.discover(path, directory_name, discovery)?;
        }
        Ok(())
    }

    fn read_source(&mut self, dir: &Path, directory_name: &str, discovery: &mut Discovery<'_>) {
        let raw_clusters = match discovery.reader.read_clusters(dir) {
            Ok(raw_clusters) => raw_clusters,
            Err(err) => {
                warn!("skipping annotation source: {err}");
                discovery.stats.sources_skipped += 1;
                return;
            }
        };
        debug!(
            "{}: {} clusters in {}",
            self.name,
            raw_clusters.len(),
            dir.display()
        );
        discovery.stats.sources_read += 1;
        for raw in &raw_clusters {
            discovery.stats.clusters_read += 1;
            record_names(discovery.registry, raw);
            let mut cluster = Cluster::new(&raw.name, directory_name, discovery.registry);
            match cluster.populate(raw, discovery.policy) {
                Ok(report) => {
                    discovery.stats.dropped_calls += report.dropped_calls;
                    discovery.stats.dropped_smcogs += report.dropped_smcogs;
                    self.add_cluster(cluster);
                }
                Err(err) => {
                    warn!(
                        "skipping cluster {} in {}: {err}",
                        raw.name,
                        dir.display()
                    );
                    discovery.stats.clusters_skipped += 1;
                }
            }
        }
    }
}

// Every entity a run sees is persisted, including ones the current layout has no column for.
fn record_names(registry: &mut NameRegistry, raw: &RawCluster) {
    for call in raw.monomers.iter().filter(|call| call.role.is_none()) {
        registry.record_observed(&call.name, call.orientation);
    }
}
