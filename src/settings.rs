//! Program settings, read from `settings.toml` in the user's configuration directory.
//!
//! Settings provide defaults for model runs. Some of them can be overridden on the command line
//! (see [`crate::cli::RunOpts`]).
use crate::get_empire_config_dir;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use crate::output::DEFAULT_RESULTS_ROOT;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for EMPIRE.
# Each setting is shown with its default value. Uncomment a line to change it.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_results_root() -> PathBuf {
    DEFAULT_RESULTS_ROOT.into()
}

fn default_solver_output() -> bool {
    true
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_empire_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// The program log level (off, error, warn, info, debug or trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Folder under which results are written, in a subfolder named after the model
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    /// Whether to overwrite a non-empty results folder
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to also write derived investment costs
    #[serde(default)]
    pub debug_model: bool,
    /// Whether to show the solver's own progress output
    #[serde(default = "default_solver_output")]
    pub solver_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            results_root: default_results_root(),
            overwrite: false,
            debug_model: false,
            solver_output: default_solver_output(),
        }
    }
}

impl Settings {
    /// Read the settings file from the user's configuration directory.
    ///
    /// Default values are used if the file is not present.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read and check settings from the specified path
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        parse_log_level(&settings.log_level)
            .with_context(|| format!("Invalid log_level in {}", file_path.display()))?;

        Ok(settings)
    }

    /// The settings as TOML, with each line preceded by the setting's documentation.
    ///
    /// If `commented` is set, the settings themselves are commented out too.
    pub fn to_documented_toml(&self, commented: bool) -> Result<String> {
        let raw = toml::to_string(self)?;
        let prefix = if commented { "# " } else { "" };

        let mut out = String::new();
        for line in raw.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };

            let docs = Settings::get_field_docs(field.trim())
                .ok()
                .with_context(|| format!("No documentation for setting {}", field.trim()))?;
            for doc_line in docs.lines() {
                writeln!(out, "\n# {prefix}{}", doc_line.trim())?;
            }
            writeln!(out, "{prefix}{}", line.trim())?;
        }

        Ok(out)
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> Result<String> {
        let body = Settings::default().to_documented_toml(true)?;
        Ok(format!("{DEFAULT_SETTINGS_FILE_HEADER}{body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(
            &file_path,
            "log_level = \"warn\"\nresults_root = \"out\"\nsolver_output = false\n",
        )
        .unwrap();

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                results_root: "out".into(),
                overwrite: false,
                debug_model: false,
                solver_output: false,
            }
        );
    }

    #[test]
    fn test_settings_unknown_field() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "output_dir = \"out\"\n").unwrap();
        assert!(Settings::load_from_path(&file_path).is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(settings.results_root, Path::new(DEFAULT_RESULTS_ROOT));
        assert!(settings.solver_output);
    }

    #[test]
    fn test_default_file_contents_round_trip() {
        let contents = Settings::default_file_contents().unwrap();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# # Whether to show the solver's own progress output"));
        assert!(contents.contains("# solver_output = true"));

        // Every setting is commented out, so the file reads as the defaults
        let settings: Settings = toml::from_str(&contents).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_documented_toml_uncommented() {
        let settings = Settings {
            debug_model: true,
            ..Settings::default()
        };
        let contents = settings.to_documented_toml(false).unwrap();
        assert!(contents.contains("\ndebug_model = true\n"));
        assert_eq!(toml::from_str::<Settings>(&contents).unwrap(), settings);
    }

    #[test]
    fn test_log_level_error_message() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "log_level = \"loud\"\n").unwrap();
        assert_error!(
            Settings::load_from_path(&file_path),
            format!("Invalid log_level in {}", file_path.display())
        );
    }
}
