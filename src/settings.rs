use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator;
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub locales: Vec<String>,
    pub ignore: Vec<String>,
    pub atomic_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: Some(0.7),
            max_tokens: None,
            locales: generator::default_supported_locales(),
            ignore: Vec::new(),
            atomic_save: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    generator: Option<GeneratorSettings>,
    catalog: Option<CatalogSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct GeneratorSettings {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    locales: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogSettings {
    ignore: Option<Vec<String>>,
    atomic_save: Option<bool>,
}

/// Merges the settings files in order; later files win key by key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(dir) = paths::base_dir() {
        ordered_paths.push(dir.join("settings.toml"));
        ordered_paths.push(dir.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

pub(crate) fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(generator) = incoming.generator {
            if let Some(model) = generator.model
                && !model.trim().is_empty()
            {
                self.model = Some(model);
            }
            if let Some(temperature) = generator.temperature
                && (0.0..=2.0).contains(&temperature)
            {
                self.temperature = Some(temperature);
            }
            if let Some(max_tokens) = generator.max_tokens
                && max_tokens > 0
            {
                self.max_tokens = Some(max_tokens);
            }
            if let Some(locales) = generator.locales {
                let locales = locales
                    .into_iter()
                    .map(|code| code.trim().to_lowercase())
                    .filter(|code| !code.is_empty())
                    .collect::<Vec<_>>();
                if !locales.is_empty() {
                    self.locales = locales;
                }
            }
        }
        if let Some(catalog) = incoming.catalog {
            if let Some(ignore) = catalog.ignore {
                self.ignore = ignore;
            }
            if let Some(atomic_save) = catalog.atomic_save {
                self.atomic_save = atomic_save;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(dir) = paths::base_dir() else {
        return Ok(());
    };
    let path = dir.join("settings.toml");
    if path.exists() {
        return Ok(());
    }
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create settings directory: {}", dir.display()))?;
    fs::write(&path, DEFAULT_SETTINGS_TOML)
        .with_context(|| format!("failed to write settings: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedded_defaults_parse() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("defaults");
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings.model.as_deref(), Some("openai:gpt-4o"));
        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.max_tokens, Some(2048));
        assert_eq!(settings.locales, generator::default_supported_locales());
        assert!(settings.atomic_save);
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("settings.toml");
        let local = dir.path().join("settings.local.toml");
        fs::write(
            &base,
            "[generator]\nmodel = \"openai:gpt-4o\"\nlocales = [\"de\", \"fr\"]\n",
        )
        .expect("write base");
        fs::write(
            &local,
            "[generator]\nmodel = \"claude\"\ntemperature = 5.0\n[catalog]\nignore = [\"*.bak.json\"]\natomic_save = false\n",
        )
        .expect("write local");

        let settings =
            load_settings_from(&[base, local, dir.path().join("missing.toml")]).expect("load");
        assert_eq!(settings.model.as_deref(), Some("claude"));
        assert_eq!(settings.locales, vec!["de", "fr"]);
        // out of range values are ignored
        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.ignore, vec!["*.bak.json"]);
        assert!(!settings.atomic_save);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[generator\n").expect("write");
        let err = load_settings_from(&[path]).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse settings"));
    }
}
