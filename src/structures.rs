use std::fs;
use std::path::{Path, PathBuf};

use gb_io::seq::{Feature, Seq};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::TallyError;
use crate::fs_util;

pub const STRUCTURE_HEADER: [&str; 5] = [
    "cluster_number",
    "cluster_type",
    "predicted_structure",
    "smiles",
    "molecular_formula",
];

/// One `region` feature of an antiSMASH GenBank record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructureRow {
    pub cluster_number: String,
    pub cluster_type: String,
    pub predicted_structure: Option<String>,
    pub smiles: Option<String>,
    pub molecular_formula: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StructureScan {
    pub files_read: usize,
    pub files_skipped: Vec<String>,
    #[serde(skip)]
    pub rows: Vec<StructureRow>,
}

fn qualifier<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature
        .qualifiers
        .iter()
        .find(|(name, _)| &**name == key)
        .map(|(_, value)| value.as_deref().unwrap_or(""))
}

pub fn rows_from_records(records: &[Seq]) -> Vec<StructureRow> {
    let mut rows = Vec::new();
    for record in records {
        for feature in &record.features {
            if &*feature.kind != "region" {
                continue;
            }
            let Some(product) = qualifier(feature, "product") else {
                continue;
            };
            let mut row = StructureRow {
                cluster_number: qualifier(feature, "region_number")
                    .unwrap_or("N/A")
                    .to_string(),
                cluster_type: product.to_string(),
                ..StructureRow::default()
            };
            if let Some(structure) = qualifier(feature, "chemical_structure") {
                row.predicted_structure = Some(structure.to_string());
                row.smiles = Some(qualifier(feature, "smiles").unwrap_or("").to_string());
                row.molecular_formula = Some(
                    qualifier(feature, "molecular_formula")
                        .unwrap_or("")
                        .to_string(),
                );
            }
            rows.push(row);
        }
    }
    rows
}

pub fn extract_file(path: &Path) -> Result<Vec<StructureRow>, TallyError> {
    let records = gb_io::reader::parse_file(path).map_err(|err| TallyError::GenBank {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(rows_from_records(&records))
}

fn is_gbk(path: &Path) -> bool {
    path.is_file() && path.extension().map(|ext| ext == "gbk").unwrap_or(false)
}

/// Reads every `.gbk` file directly inside `dir`; files that fail to parse are skipped.
pub fn scan_directory(dir: &Path) -> Result<StructureScan, TallyError> {
    if !dir.is_dir() {
        return Err(TallyError::MissingRoot(dir.to_path_buf()));
    }
    let mut scan = StructureScan::default();
    let files: Vec<PathBuf> = fs_util::sorted_entries(dir)?
        .into_iter()
        .filter(|path| is_gbk(path))
        .collect();
    for path in files {
        info!("processing {}", path.display());
        match extract_file(&path) {
            Ok(rows) => {
                scan.files_read += 1;
                scan.rows.extend(rows);
            }
            Err(err) => {
                warn!("skipping GenBank file: {err}");
                scan.files_skipped.push(path.display().to_string());
            }
        }
    }
    Ok(scan)
}

pub fn write_csv(rows: &[StructureRow], output: &Path) -> Result<(), TallyError> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| TallyError::Filesystem(format!("create {}: {err}", parent.display())))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output)
        .map_err(|err| TallyError::Csv(err.to_string()))?;
    writer
        .write_record(STRUCTURE_HEADER)
        .map_err(|err| TallyError::Csv(err.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| TallyError::Csv(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| TallyError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use gb_io::seq::Location;

    use super::*;

    fn region(qualifiers: &[(&'static str, &str)]) -> Feature {
        Feature {
            kind: "region".into(),
            location: Location::simple_range(0, 100),
            qualifiers: qualifiers
                .iter()
                .map(|(key, value)| ((*key).into(), Some(value.to_string())))
                .collect(),
        }
    }

    fn record(features: Vec<Feature>) -> Seq {
        let mut seq = Seq::empty();
        seq.features = features;
        seq
    }

    #[test]
    fn regions_with_product_become_rows() {
        let seq = record(vec![
            region(&[
                ("region_number", "3"),
                ("product", "NRPS"),
                ("chemical_structure", "Gly-Ala"),
                ("smiles", "NCC(=O)NC(C)C(=O)O"),
            ]),
            region(&[("product", "terpene")]),
            region(&[("region_number", "5")]),
        ]);
        let rows = rows_from_records(&[seq]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cluster_number, "3");
        assert_eq!(rows[0].predicted_structure.as_deref(), Some("Gly-Ala"));
        assert_eq!(rows[0].molecular_formula.as_deref(), Some(""));
        assert_eq!(rows[1].cluster_number, "N/A");
        assert_eq!(rows[1].cluster_type, "terpene");
        assert_eq!(rows[1].smiles, None);
    }

    #[test]
    fn non_region_features_are_ignored() {
        let mut cds = region(&[("product", "NRPS")]);
        cds.kind = "CDS".into();
        assert!(rows_from_records(&[record(vec![cds])]).is_empty());
    }

    #[test]
    fn csv_has_fixed_header() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("structures.csv");
        let rows = vec![StructureRow {
            cluster_number: "1".to_string(),
            cluster_type: "NRPS,t1pks".to_string(),
            ..StructureRow::default()
        }];
        write_csv(&rows, &output).unwrap();
        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            "cluster_number,cluster_type,predicted_structure,smiles,molecular_formula\n\
             1,\"NRPS,t1pks\",,,\n"
        );
    }
}
