use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use bgc_tally::config::{Config, ConfigLoader, StructuresConfig};
use bgc_tally::domain::UnknownEntityPolicy;
use bgc_tally::error::TallyError;

#[test]
fn resolve_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bgc-tally.json");
    fs::write(
        &path,
        r#"{
            "input_root": "/data/batch_output",
            "output": "tables/result.tsv",
            "separator": "-",
            "buffer_capacity": 4096,
            "unknown_entity_policy": "skip-cluster",
            "structures": { "input_dir": "gbk" }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(
        resolved.input_root,
        Some(Utf8PathBuf::from("/data/batch_output"))
    );
    assert_eq!(resolved.output, Utf8PathBuf::from("tables/result.tsv"));
    assert_eq!(resolved.registry, Utf8PathBuf::from("aminoacidNames.json"));
    assert_eq!(resolved.separator, "-");
    assert_eq!(resolved.buffer_capacity, 4096);
    assert_eq!(
        resolved.unknown_entity_policy,
        UnknownEntityPolicy::SkipCluster
    );
    assert_eq!(resolved.structures_input, Some(Utf8PathBuf::from("gbk")));
    assert_eq!(
        resolved.structures_output,
        Utf8PathBuf::from("extracted_structures.csv")
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TallyError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bgc-tally.json");
    fs::write(&path, r#"{"unknown_entity_policy": "explode"}"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TallyError::ConfigParse(_));
}

#[test]
fn zero_buffer_is_rejected() {
    let config = Config {
        buffer_capacity: Some(0),
        structures: Some(StructuresConfig::default()),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(TallyError::ConfigParse(_))
    );
}
