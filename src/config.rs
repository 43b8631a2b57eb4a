//! Configuration for encoding and decoding records
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (records.toml)
//! - Environment variables (RECORDS__*)
//!
//! ## Example config file (records.toml):
//! ```toml
//! [codec]
//! compression = "deflate"
//! strict_order = false
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Codec settings
    #[serde(default)]
    pub codec: CodecConfig,

    /// JSON output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Codec configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Block compression of the object container
    #[serde(default)]
    pub compression: Compression,

    /// Reject an entry order property that does not list exactly the
    /// record's entries
    #[serde(default)]
    pub strict_order: bool,
}

/// Container block compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Null,
    #[default]
    Deflate,
}

impl From<Compression> for apache_avro::Codec {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Null => apache_avro::Codec::Null,
            Compression::Deflate => apache_avro::Codec::Deflate,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    /// Render a JSON value in this format
    pub fn render(&self, value: &serde_json::Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

impl RecordsConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file at `config_path`
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["records.toml", ".records.toml", "config/records.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "records") {
            let xdg_config = config_dir.config_dir().join("records.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // RECORDS__CODEC__COMPRESSION=null
        builder = builder.add_source(
            Environment::with_prefix("RECORDS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecordsConfig::default();
        assert_eq!(config.codec.compression, Compression::Deflate);
        assert!(!config.codec.strict_order);
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = toml::to_string_pretty(&RecordsConfig::default()).unwrap();
        assert!(toml_str.contains("[codec]"));
        assert!(toml_str.contains("compression = \"deflate\""));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let path = path.to_str().unwrap();

        let mut config = RecordsConfig::default();
        config.codec.compression = Compression::Null;
        config.codec.strict_order = true;
        config.output.format = OutputFormat::Compact;
        config.save(path).unwrap();

        let loaded = RecordsConfig::load_from(Some(path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[codec]\nstrict_order = true\n").unwrap();

        let loaded = RecordsConfig::load_from(path.to_str()).unwrap();
        assert!(loaded.codec.strict_order);
        assert_eq!(loaded.codec.compression, Compression::Deflate);
    }

    #[test]
    fn test_compression_maps_to_codec() {
        assert!(matches!(apache_avro::Codec::from(Compression::Null), apache_avro::Codec::Null));
        assert!(matches!(apache_avro::Codec::from(Compression::Deflate), apache_avro::Codec::Deflate));
    }

    #[test]
    fn test_render_formats() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), "{\"a\":1}");
        assert!(OutputFormat::Pretty.render(&value).unwrap().contains('\n'));
    }
}
