// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings file loading.

use std::io::ErrorKind;
use std::path::Path;

use bindwerk_core::AppConfig;
use bindwerk_core::error::{BindwerkError, Result};
use tracing::{debug, info};

use super::data_dir;

/// Settings file name inside the configuration directory.
pub const CONFIG_FILE: &str = "config.json";

/// Load settings from `explicit`, or from the default location.
///
/// A missing default file yields the built-in defaults; a missing explicit
/// file or a malformed file of either kind is a `Config` error.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => read_config(path, true),
        None => read_config(&data_dir::config_dir().join(CONFIG_FILE), false),
    }
}

fn read_config(path: &Path, required: bool) -> Result<AppConfig> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(BindwerkError::Config(format!("cannot read {}: {err}", path.display())));
        }
    };
    let config = serde_json::from_str(&data)
        .map_err(|err| BindwerkError::Config(format!("{}: {err}", path.display())))?;
    info!(path = %path.display(), "Settings loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindwerk_core::types::{DeckLayout, OutputFormat};

    #[test]
    fn missing_default_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config(&dir.path().join(CONFIG_FILE), false).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, BindwerkError::Config(_)));
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "default_format": "SlideDeck", "default_layout": "FullBleedFit", "output_suffix": "_all" }"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.default_format, OutputFormat::SlideDeck);
        assert_eq!(config.default_layout, DeckLayout::FullBleedFit);
        assert_eq!(config.output_suffix, "_all");
        assert_eq!(config.medium_quality, 60);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(BindwerkError::Config(_))));
    }
}
