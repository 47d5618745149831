//! `tilecache config`: show the resolved cache settings.

use std::path::{Path, PathBuf};

use tilecache::config::CacheSettings;
use tracing::debug;

use crate::error::CliError;

/// Default location of the settings file: `<config dir>/tilecache/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tilecache").join("config.ini"))
}

/// Load settings from `explicit`, or from the default location when it exists.
///
/// An explicit path must exist; a missing default file yields the defaults.
pub fn resolve(explicit: Option<&Path>) -> Result<(CacheSettings, Option<PathBuf>), CliError> {
    if let Some(path) = explicit {
        return Ok((CacheSettings::load(path)?, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if path.exists() => Ok((CacheSettings::load(&path)?, Some(path))),
        other => {
            debug!(path = ?other, "No config file, using defaults");
            Ok((CacheSettings::default(), None))
        }
    }
}

/// Run the config command, printing INI-style text or JSON.
pub fn run(explicit: Option<&Path>, json: bool) -> Result<(), CliError> {
    let (settings, source) = resolve(explicit)?;
    if json {
        println!("{}", render_json(&settings)?);
    } else {
        print!("{}", render(&settings, source.as_deref()));
    }
    Ok(())
}

fn render_json(settings: &CacheSettings) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(settings)?)
}

fn render(settings: &CacheSettings, source: Option<&Path>) -> String {
    let source = match source {
        Some(path) => path.display().to_string(),
        None => "(defaults)".to_string(),
    };
    let high_water = if settings.high_water_mark == 0 {
        "(unbounded)".to_string()
    } else {
        settings.high_water_mark.to_string()
    };

    format!(
        "Configuration: {}\n\n[cache]\n  ttl = {}\n  stale = {}\n  memory_max_bytes = {}\n  high_water_mark = {}\n",
        source,
        settings.ttl,
        settings.stale,
        settings.memory_max_bytes,
        high_water
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[cache]\nttl = 60\nhigh_water_mark = 16\n").unwrap();

        let (settings, source) = resolve(Some(&path)).unwrap();
        assert_eq!(settings.ttl, 60);
        assert_eq!(settings.high_water_mark, 16);
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_resolve_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.ini");
        assert!(matches!(resolve(Some(&path)), Err(CliError::Config(_))));
    }

    #[test]
    fn test_render() {
        let out = render(&CacheSettings::default(), None);
        assert!(out.starts_with("Configuration: (defaults)"));
        assert!(out.contains("ttl = 300"));
        assert!(out.contains("stale = 0"));
        assert!(out.contains("high_water_mark = (unbounded)"));
    }

    #[test]
    fn test_render_json() {
        let settings = CacheSettings {
            ttl: 60,
            high_water_mark: 16,
            ..CacheSettings::default()
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&settings).unwrap()).unwrap();

        assert_eq!(value["ttl"], 60);
        assert_eq!(value["stale"], 0);
        assert_eq!(value["high_water_mark"], 16);
        assert_eq!(
            value.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["ttl", "stale", "memory_max_bytes", "high_water_mark"]
        );
    }
}
