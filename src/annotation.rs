use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::Orientation;
use crate::error::TallyError;

pub const GENECLUSTERS_MARKER: &str = "geneclusters.js";

/// One gene cluster as handed over by an annotation reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCluster {
    pub name: String,
    pub product: String,
    pub predicted_structure: Option<String>,
    pub smiles: Option<String>,
    pub molecular_formula: Option<String>,
    pub monomers: Vec<MonomerCall>,
    pub epimerization: u64,
    pub smcogs: Vec<u32>,
}

/// Predicted substrate of one adenylation domain, with per-method vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonomerCall {
    pub name: String,
    pub orientation: Orientation,
    /// `starter` or `ser_pro`; absent for ordinary extender units.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub predictions: BTreeMap<String, u64>,
}

pub trait AnnotationReader {
    /// Whether `dir` holds one assembly's annotation output.
    fn is_annotation_dir(&self, dir: &Path) -> bool;

    fn read_clusters(&self, dir: &Path) -> Result<Vec<RawCluster>, TallyError>;
}

/// Reads the `geneclusters.js` payload that antiSMASH 4 writes next to its HTML report.
#[derive(Debug, Clone)]
pub struct GeneclustersJsReader {
    marker: String,
}

impl Default for GeneclustersJsReader {
    fn default() -> Self {
        Self::new(GENECLUSTERS_MARKER)
    }
}

#[derive(Debug, Deserialize)]
struct GeneclusterEntry {
    #[serde(default)]
    idx: Option<u32>,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    orfs: Vec<OrfEntry>,
}

#[derive(Debug, Deserialize)]
struct OrfEntry {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct DetailsEntry {
    #[serde(default)]
    monomers: Vec<MonomerCall>,
    #[serde(default)]
    epimerization: u64,
    #[serde(default)]
    structure: Option<String>,
    #[serde(default)]
    smiles: Option<String>,
    #[serde(default)]
    formula: Option<String>,
}

impl GeneclustersJsReader {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn parse(content: &str) -> Result<Vec<RawCluster>, String> {
        let geneclusters: BTreeMap<String, GeneclusterEntry> =
            extract_assignment(content, Assignment::Geneclusters)?
                .ok_or_else(|| "no geneclusters assignment".to_string())?;
        let mut details: BTreeMap<String, DetailsEntry> =
            extract_assignment(content, Assignment::DetailsData)?.unwrap_or_default();

        let mut ordered = geneclusters.into_iter().collect::<Vec<_>>();
        ordered.sort_by(|(left_name, left), (right_name, right)| {
            let left_idx = left.idx.unwrap_or(u32::MAX);
            let right_idx = right.idx.unwrap_or(u32::MAX);
            left_idx
                .cmp(&right_idx)
                .then_with(|| left_name.cmp(right_name))
        });

        let clusters = ordered
            .into_iter()
            .map(|(name, entry)| {
                let detail = details.remove(&name).unwrap_or_default();
                let smcogs = entry
                    .orfs
                    .iter()
                    .flat_map(|orf| smcog_ids(&orf.description))
                    .collect();
                RawCluster {
                    name,
                    product: entry.kind,
                    predicted_structure: detail.structure,
                    smiles: detail.smiles,
                    molecular_formula: detail.formula,
                    monomers: detail.monomers,
                    epimerization: detail.epimerization,
                    smcogs,
                }
            })
            .collect();
        Ok(clusters)
    }
}

impl AnnotationReader for GeneclustersJsReader {
    fn is_annotation_dir(&self, dir: &Path) -> bool {
        dir.join(&self.marker).is_file()
    }

    fn read_clusters(&self, dir: &Path) -> Result<Vec<RawCluster>, TallyError> {
        let path = dir.join(&self.marker);
        let content = fs::read_to_string(&path).map_err(|err| TallyError::Annotation {
            path: path.clone(),
            message: err.to_string(),
        })?;
        Self::parse(&content).map_err(|message| TallyError::Annotation { path, message })
    }
}

/// Variables assigned in `geneclusters.js`.
#[derive(Debug, Clone, Copy)]
enum Assignment {
    Geneclusters,
    DetailsData,
}

impl Assignment {
    fn name(self) -> &'static str {
        match self {
            Assignment::Geneclusters => "geneclusters",
            Assignment::DetailsData => "details_data",
        }
    }

    fn regex(self) -> &'static Regex {
        static GENECLUSTERS: OnceLock<Regex> = OnceLock::new();
        static DETAILS_DATA: OnceLock<Regex> = OnceLock::new();
        let cell = match self {
            Assignment::Geneclusters => &GENECLUSTERS,
            Assignment::DetailsData => &DETAILS_DATA,
        };
        cell.get_or_init(|| {
            let pattern = format!(r"(?m)^\s*(?:var|let|const)?\s*{}\s*=\s*", self.name());
            Regex::new(&pattern).expect("valid assignment regex")
        })
    }
}

/// Deserializes the JSON value assigned by `var <name> = ...;`, ignoring whatever follows it.
fn extract_assignment<T: DeserializeOwned>(
    content: &str,
    assignment: Assignment,
) -> Result<Option<T>, String> {
    let name = assignment.name();
    let Some(found) = assignment.regex().find(content) else {
        return Ok(None);
    };
    let rest = &content[found.end()..];
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<T>();
    match values.next() {
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(err)) => Err(format!("{name}: {err}")),
        None => Err(format!("{name}: empty assignment")),
    }
}

/// smCOG family numbers mentioned in an ORF description, e.g. `smCOG: SMCOG1062:AMP-binding`.
pub fn smcog_ids(description: &str) -> Vec<u32> {
    static SMCOG: OnceLock<Regex> = OnceLock::new();
    let regex = SMCOG.get_or_init(|| Regex::new(r"SMCOG(\d+)").expect("valid smCOG regex"));
    regex
        .captures_iter(description)
        .filter_map(|captures| captures[1].parse().ok())
        .collect()
}
