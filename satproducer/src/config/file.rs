//! Settings file loading.

use ini::Ini;
use std::path::Path;
use thiserror::Error;

use super::settings::ProducerSettings;

/// Settings file errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or parse the INI file
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Settings file has no [{0}] section")]
    MissingSection(String),

    #[error("Missing setting: {section}.{key}")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value
    #[error("Invalid setting: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ProducerSettings {
    /// Load `section` of the INI file at `path`.
    pub fn load_from(path: &Path, section: &str) -> Result<Self, SettingsError> {
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini, section, path.parent())
    }

    /// Parse settings from INI text; relative paths stay relative.
    pub fn from_ini_str(text: &str, section: &str) -> Result<Self, SettingsError> {
        let ini = Ini::load_from_str(text).map_err(ini::Error::Parse)?;
        super::parser::parse_ini(&ini, section, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_resolves_relative_product_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("producer.ini");
        std::fs::write(
            &config_path,
            "[default]\ninstruments = seviri\nproduct_config_file = products.json\n",
        )
        .unwrap();

        let settings = ProducerSettings::load_from(&config_path, "default").unwrap();
        assert_eq!(
            settings.product_config_file,
            temp_dir.path().join("products.json")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ProducerSettings::load_from(&temp_dir.path().join("none.ini"), "default");
        assert!(matches!(result, Err(SettingsError::ReadError(_))));
    }

    #[test]
    fn test_from_ini_str_keeps_relative_paths() {
        let settings = ProducerSettings::from_ini_str(
            "[default]\ninstruments = seviri\nproduct_config_file = products.json\n",
            "default",
        )
        .unwrap();
        assert_eq!(settings.product_config_file, PathBuf::from("products.json"));
        assert!(settings.handles_any(&["seviri".to_string()]));
        assert!(!settings.handles_any(&["viirs".to_string()]));
    }
}
