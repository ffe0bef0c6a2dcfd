use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::coerce::TimePrecision;

/// Settings that change how raw values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    /// Unit of numeric epoch timestamps.
    pub precision: TimePrecision,
    /// Copy series tag values into bound fields of each mapped row.
    pub apply_tags: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            precision: TimePrecision::default(),
            apply_tags: true,
        }
    }
}

impl MapperConfig {
    /// Loads YAML (`.yml`/`.yaml`) or JSON (`.json`) configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening config file {path:?}"))?;
        match config_format(path) {
            Some(Format::Json) => {
                serde_json::from_str(&raw).with_context(|| format!("Parsing JSON config {path:?}"))
            }
            Some(Format::Yaml) => {
                serde_yaml::from_str(&raw).with_context(|| format!("Parsing YAML config {path:?}"))
            }
            None => bail!(
                "Unsupported config extension for {path:?} (expected .yml, .yaml or .json)"
            ),
        }
    }

    pub fn with_precision(mut self, precision: Option<TimePrecision>) -> Self {
        if let Some(precision) = precision {
            self.precision = precision;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Json,
    Yaml,
}

pub(crate) fn config_format(path: &Path) -> Option<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Format::Json),
        Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
            Some(Format::Yaml)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::Builder;

    use super::*;

    #[test]
    fn yaml_config_fills_missing_fields_with_defaults() {
        let mut file = Builder::new().suffix(".yml").tempfile().expect("temp file");
        writeln!(file, "precision: s").unwrap();
        let config = MapperConfig::load(file.path()).expect("load config");
        assert_eq!(config.precision, TimePrecision::Seconds);
        assert!(config.apply_tags);
    }

    #[test]
    fn json_config_is_supported() {
        let mut file = Builder::new().suffix(".json").tempfile().expect("temp file");
        write!(file, r#"{{"apply_tags": false}}"#).unwrap();
        let config = MapperConfig::load(file.path()).expect("load config");
        assert_eq!(config.precision, TimePrecision::Milliseconds);
        assert!(!config.apply_tags);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        assert!(MapperConfig::load(file.path()).is_err());
    }

    #[test]
    fn precision_override_only_applies_when_given() {
        let base = MapperConfig::default();
        assert_eq!(base.with_precision(None), base);
        assert_eq!(
            base.with_precision(Some(TimePrecision::Hours)).precision,
            TimePrecision::Hours
        );
    }
}
