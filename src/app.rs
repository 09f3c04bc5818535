use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{error, info};

use crate::annotation::AnnotationReader;
use crate::bundle::EntityTotals;
use crate::config::ResolvedConfig;
use crate::domain::{Orientation, UnknownEntityPolicy, genus_key};
use crate::error::TallyError;
use crate::fs_util;
use crate::genus::{Discovery, DiscoveryStats, Genus};
use crate::projection::Schema;
use crate::registry::NameRegistry;
use crate::sink::BufferedSink;
use crate::structures;

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub input_root: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub registry: Utf8PathBuf,
    pub separator: String,
    pub buffer_capacity: usize,
    pub policy: UnknownEntityPolicy,
}

impl AggregateOptions {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, TallyError> {
        let input_root = config.input_root.clone().ok_or(TallyError::MissingInput)?;
        Ok(Self {
            input_root,
            output: config.output.clone(),
            registry: config.registry.clone(),
            separator: config.separator.clone(),
            buffer_capacity: config.buffer_capacity,
            policy: config.unknown_entity_policy,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenusSummary {
    pub name: String,
    pub directories: usize,
    pub clusters: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub output: String,
    pub registry: String,
    pub columns: usize,
    pub rows_written: usize,
    pub genera: Vec<GenusSummary>,
    pub discovery: DiscoveryStats,
    pub observed_l: usize,
    pub observed_d: usize,
    pub totals_l: BTreeMap<String, BTreeMap<String, u64>>,
    pub totals_d: BTreeMap<String, BTreeMap<String, u64>>,
    pub finished_at: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructuresResult {
    pub input_dir: String,
    pub output: String,
    pub files_read: usize,
    pub files_skipped: Vec<String>,
    pub rows_written: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// State of one aggregation over a batch directory.
///
/// Each top-level directory is discovered into a [`Genus`] and flushed to the sink
/// before the next one is read, so at most one genus worth of clusters is held.
/// The header comes from the registry-derived [`Schema`] and every row is checked
/// against it before it is written.
pub struct AggregationRun<'a> {
    reader: &'a dyn AnnotationReader,
    registry: NameRegistry,
    schema: Schema,
    sink: BufferedSink,
    separator: String,
    policy: UnknownEntityPolicy,
    stats: DiscoveryStats,
    genera: BTreeMap<String, GenusSummary>,
    totals_l: EntityTotals,
    totals_d: EntityTotals,
    rows_written: usize,
}

impl<'a> AggregationRun<'a> {
    /// Writes the header immediately; nothing else touches the sink until the first flush.
    pub fn start(
        reader: &'a dyn AnnotationReader,
        registry: NameRegistry,
        sink: BufferedSink,
        separator: impl Into<String>,
        policy: UnknownEntityPolicy,
    ) -> Result<Self, TallyError> {
        let schema = Schema::from_registry(&registry);
        let mut run = Self {
            reader,
            registry,
            schema,
            sink,
            separator: separator.into(),
            policy,
            stats: DiscoveryStats::default(),
            genera: BTreeMap::new(),
            totals_l: EntityTotals::new(),
            totals_d: EntityTotals::new(),
            rows_written: 0,
        };
        let header = run.schema.header_line();
        run.sink.write(&header)?;
        Ok(run)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Discovers and flushes every top-level directory of `root`, in name order.
    /// Symlinked entries are skipped.
    pub fn traverse(
        &mut self,
        root: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<(), TallyError> {
        for path in fs_util::sorted_entries(root)? {
            if !fs_util::is_plain_dir(&path) {
                continue;
            }
            let directory_name = fs_util::file_name_lossy(&path);
            let started = Instant::now();
            let genus = self.discover_entry(&path, &directory_name)?;
            let rows = self.flush_genus(&genus)?;
            progress.event(ProgressEvent {
                message: format!(
                    "phase=Flush; genus {} from {directory_name}: {rows} clusters",
                    genus.name()
                ),
                elapsed: Some(started.elapsed()),
            });
        }
        Ok(())
    }

    /// Builds the genus for one top-level directory.
    pub fn discover_entry(
        &mut self,
        path: &Path,
        directory_name: &str,
    ) -> Result<Genus, TallyError> {
        let key = genus_key(directory_name, &self.separator).to_string();
        let mut genus = Genus::new(key);
        let mut discovery = Discovery::new(self.reader, &mut self.registry, self.policy);
        genus.discover(path, directory_name, &mut discovery)?;
        self.stats.absorb(&discovery.stats);
        Ok(genus)
    }

    /// Projects and buffers every cluster of `genus`, returning the number of rows.
    pub fn flush_genus(&mut self, genus: &Genus) -> Result<usize, TallyError> {
        for cluster in genus.clusters() {
            let projection = cluster.project();
            if let Some(column) = self.schema.mismatch(&projection) {
                return Err(TallyError::ColumnMismatch {
                    cluster: cluster.name().to_string(),
                    expected: self.schema.len(),
                    found: projection.len(),
                    column,
                });
            }
            self.sink.write(&projection.row_line())?;
            self.totals_l.merge(cluster.aminoacids(Orientation::L));
            self.totals_d.merge(cluster.aminoacids(Orientation::D));
            self.rows_written += 1;
        }

        let summary = self
            .genera
            .entry(genus.name().to_string())
            .or_insert_with(|| GenusSummary {
                name: genus.name().to_string(),
                directories: 0,
                clusters: 0,
            });
        summary.directories += 1;
        summary.clusters += genus.len();
        info!("flushed genus {} ({} clusters)", genus.name(), genus.len());
        Ok(genus.len())
    }

    /// Flushes what is still buffered and persists the names this run observed.
    pub fn finish(
        mut self,
        registry_path: &Utf8Path,
        started: Instant,
    ) -> Result<AggregateResult, TallyError> {
        self.sink.flush()?;
        self.registry.persist(registry_path.as_std_path())?;
        Ok(AggregateResult {
            output: self.sink.path().to_string(),
            registry: registry_path.to_string(),
            columns: self.schema.len(),
            rows_written: self.rows_written,
            genera: self.genera.into_values().collect(),
            discovery: self.stats,
            observed_l: self.registry.observed(Orientation::L).len(),
            observed_d: self.registry.observed(Orientation::D).len(),
            totals_l: self.totals_l.to_summary(),
            totals_d: self.totals_d.to_summary(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Last-chance flush after a fatal error; the original error wins.
    pub fn abandon(mut self) {
        if let Err(err) = self.sink.flush() {
            error!("final flush failed: {err}");
        }
    }
}

#[derive(Clone)]
pub struct App<R: AnnotationReader> {
    reader: R,
}

impl<R: AnnotationReader> App<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn aggregate(
        &self,
        options: &AggregateOptions,
        progress: &dyn ProgressSink,
    ) -> Result<AggregateResult, TallyError> {
        let started = Instant::now();
        let root = options.input_root.as_std_path();
        if !root.is_dir() {
            return Err(TallyError::MissingRoot(root.to_path_buf()));
        }

        progress.event(ProgressEvent {
            message: format!("phase=Resolve; loading name registry {}", options.registry),
            elapsed: None,
        });
        let registry = NameRegistry::load(options.registry.as_std_path());
        let sink = BufferedSink::create(options.output.clone(), options.buffer_capacity)?;
        let mut run = AggregationRun::start(
            &self.reader,
            registry,
            sink,
            options.separator.clone(),
            options.policy,
        )?;

        progress.event(ProgressEvent {
            message: format!(
                "phase=Traverse; {} columns, scanning {}",
                run.schema().len(),
                options.input_root
            ),
            elapsed: None,
        });
        if let Err(err) = run.traverse(root, progress) {
            run.abandon();
            return Err(err);
        }

        let result = run.finish(&options.registry, started)?;
        progress.event(ProgressEvent {
            message: format!("phase=Done; {} rows written", result.rows_written),
            elapsed: Some(started.elapsed()),
        });
        Ok(result)
    }

    pub fn extract_structures(
        &self,
        input_dir: &Utf8Path,
        output: &Utf8Path,
        progress: &dyn ProgressSink,
    ) -> Result<StructuresResult, TallyError> {
        let started = Instant::now();
        progress.event(ProgressEvent {
            message: format!("phase=Traverse; scanning {input_dir} for GenBank files"),
            elapsed: None,
        });
        let scan = structures::scan_directory(input_dir.as_std_path())?;
        structures::write_csv(&scan.rows, output.as_std_path())?;
        progress.event(ProgressEvent {
            message: format!("phase=Done; data saved to {output}"),
            elapsed: Some(started.elapsed()),
        });
        Ok(StructuresResult {
            input_dir: input_dir.to_string(),
            output: output.to_string(),
            files_read: scan.files_read,
            files_skipped: scan.files_skipped,
            rows_written: scan.rows.len(),
        })
    }
}
