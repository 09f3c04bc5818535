use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::annotation::GENECLUSTERS_MARKER;
use crate::domain::UnknownEntityPolicy;
use crate::error::TallyError;
use crate::sink::BufferedSink;

pub const DEFAULT_CONFIG: &str = "bgc-tally.json";
pub const DEFAULT_OUTPUT: &str = "result.tsv";
pub const DEFAULT_REGISTRY: &str = "aminoacidNames.json";
pub const DEFAULT_STRUCTURES_OUTPUT: &str = "extracted_structures.csv";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input_root: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub buffer_capacity: Option<usize>,
    #[serde(default)]
    pub unknown_entity_policy: Option<UnknownEntityPolicy>,
    #[serde(default)]
    pub structures: Option<StructuresConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StructuresConfig {
    #[serde(default)]
    pub input_dir: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub input_root: Option<Utf8PathBuf>,
    pub output: Utf8PathBuf,
    pub registry: Utf8PathBuf,
    pub separator: String,
    pub marker: String,
    pub buffer_capacity: usize,
    pub unknown_entity_policy: UnknownEntityPolicy,
    pub structures_input: Option<Utf8PathBuf>,
    pub structures_output: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `bgc-tally.json` when present. With no explicit path and no
    /// default file, every field takes its default.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, TallyError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| TallyError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| TallyError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, TallyError> {
        let buffer_capacity = config
            .buffer_capacity
            .unwrap_or(BufferedSink::DEFAULT_CAPACITY);
        if buffer_capacity == 0 {
            return Err(TallyError::ConfigParse(
                "buffer_capacity must be positive".to_string(),
            ));
        }
        let structures = config.structures.unwrap_or_default();

        Ok(ResolvedConfig {
            input_root: config.input_root.map(Utf8PathBuf::from),
            output: Utf8PathBuf::from(config.output.as_deref().unwrap_or(DEFAULT_OUTPUT)),
            registry: Utf8PathBuf::from(config.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)),
            separator: config.separator.unwrap_or_else(|| "_".to_string()),
            marker: config
                .marker
                .unwrap_or_else(|| GENECLUSTERS_MARKER.to_string()),
            buffer_capacity,
            unknown_entity_policy: config.unknown_entity_policy.unwrap_or_default(),
            structures_input: structures.input_dir.map(Utf8PathBuf::from),
            structures_output: Utf8PathBuf::from(
                structures
                    .output
                    .as_deref()
                    .unwrap_or(DEFAULT_STRUCTURES_OUTPUT),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.input_root, None);
        assert_eq!(resolved.output, Utf8PathBuf::from("result.tsv"));
        assert_eq!(resolved.registry, Utf8PathBuf::from("aminoacidNames.json"));
        assert_eq!(resolved.separator, "_");
        assert_eq!(resolved.marker, "geneclusters.js");
        assert_eq!(resolved.buffer_capacity, 16 * 1024);
        assert_eq!(resolved.unknown_entity_policy, UnknownEntityPolicy::SkipCluster);
        assert_eq!(
            resolved.structures_output,
            Utf8PathBuf::from("extracted_structures.csv")
        );
    }
}
