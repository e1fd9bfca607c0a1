// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration resolution for the CLI.
//
// Order: an explicit `--config` file (errors are fatal), else `config.json`
// in the data directory (errors fall back to defaults), else defaults.
// Environment variables are overlaid last.

use std::path::Path;

use docverify_core::PipelineConfig;
use docverify_core::error::Result;
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

pub fn load(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let config = match explicit {
        Some(path) => PipelineConfig::load(path)?,
        None => load_default(&data_dir::data_dir()),
    };
    let config = config.apply_env();
    config.validate()?;
    Ok(config)
}

fn load_default(dir: &Path) -> PipelineConfig {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        info!("no config file found; using defaults");
        return PipelineConfig::default();
    }
    match PipelineConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable config file");
            PipelineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_default(dir.path()), PipelineConfig::default());
    }

    #[test]
    fn broken_default_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(load_default(dir.path()), PipelineConfig::default());
    }

    #[test]
    fn default_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"recognition": {"confidence_threshold": 0.8}}"#,
        )
        .unwrap();
        assert_eq!(load_default(dir.path()).recognition.confidence_threshold, 0.8);
    }

    #[test]
    fn broken_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
