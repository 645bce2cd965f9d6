//! In-memory store of every locale's translation files.
//!
//! On disk a catalog is `<root>/<locale>/<file>.json`, each file a flat JSON
//! object of string values. In memory it is locale -> file -> key -> value.
//! [`Catalog::normalize`] aligns all locales so that every locale carries
//! every known file, and every file carries the same key set in every
//! locale, with `""` standing in for a missing translation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{EditorError, EditorResult};

mod ignore;

pub(crate) use ignore::CatalogIgnore;

pub const CATALOG_EXTENSION: &str = "json";

/// Key -> value mapping of one (locale, file) pair.
pub type Entries = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locales: BTreeMap<String, BTreeMap<String, Entries>>,
    /// file -> locales that lacked the file when it was normalized
    absent: BTreeMap<String, BTreeSet<String>>,
}

/// Two catalogs are equal when they hold the same translations; the record
/// of which files were absent at load time is not compared.
impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.locales == other.locales
    }
}

impl Eq for Catalog {}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Write each file through a temp file renamed over the target.
    pub atomic: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { atomic: true }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and normalizes the catalog under `root`.
    pub fn open(root: &Path, options: &LoadOptions) -> EditorResult<Self> {
        Ok(Self::load_with(root, options)?.normalize())
    }

    pub fn load(root: &Path) -> EditorResult<Self> {
        Self::load_with(root, &LoadOptions::default())
    }

    /// Reads every `<root>/<locale>/*.json` file without aligning locales.
    ///
    /// Fails on the first file that is not a flat object of strings; nothing
    /// is returned in that case, so a caller's previous catalog stays intact.
    pub fn load_with(root: &Path, options: &LoadOptions) -> EditorResult<Self> {
        let ignore = CatalogIgnore::new(&options.ignore)?;
        let mut catalog = Catalog::new();

        for locale_dir in sorted_dir_entries(root)? {
            if !locale_dir.is_dir() {
                continue;
            }
            let Some(locale) = utf8_file_name(&locale_dir) else {
                warn!("skipping non UTF-8 directory {}", locale_dir.display());
                continue;
            };
            if ignore.is_ignored(&locale, true) {
                debug!("ignoring locale directory {}", locale);
                continue;
            }

            let files = catalog.locales.entry(locale.clone()).or_default();
            for path in sorted_dir_entries(&locale_dir)? {
                if !path.is_file()
                    || path.extension().and_then(|ext| ext.to_str()) != Some(CATALOG_EXTENSION)
                {
                    continue;
                }
                let Some(file_name) = utf8_file_name(&path) else {
                    warn!("skipping non UTF-8 file {}", path.display());
                    continue;
                };
                if ignore.is_ignored(&format!("{}/{}", locale, file_name), false) {
                    debug!("ignoring {}/{}", locale, file_name);
                    continue;
                }
                let entries = read_entries(&path)?;
                debug!("loaded {}/{} ({} keys)", locale, file_name, entries.len());
                files.insert(file_name, entries);
            }
        }

        info!(
            "loaded {} locale(s), {} file(s) from {}",
            catalog.locales.len(),
            catalog.files().len(),
            root.display()
        );
        Ok(catalog)
    }

    /// Gives every locale every known file and every file the union of keys.
    pub fn normalize(mut self) -> Self {
        self.normalize_in_place();
        self
    }

    pub(crate) fn normalize_in_place(&mut self) {
        let files = self
            .files()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        for file in &files {
            let keys = self
                .keys(file)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>();
            for (locale, locale_files) in self.locales.iter_mut() {
                let entries = locale_files.entry(file.clone()).or_insert_with(|| {
                    self.absent
                        .entry(file.clone())
                        .or_default()
                        .insert(locale.clone());
                    Entries::new()
                });
                for key in &keys {
                    entries.entry(key.clone()).or_default();
                }
            }
        }
    }

    /// Writes every (locale, file) pair under `root`, returning how many
    /// files were written. Files written before a failure stay written.
    pub fn save(&self, root: &Path, options: SaveOptions) -> EditorResult<usize> {
        let mut written = 0usize;
        for (locale, files) in &self.locales {
            let dir = root.join(locale);
            fs::create_dir_all(&dir).map_err(|err| EditorError::io(&dir, err))?;
            for (file, entries) in files {
                let path = dir.join(file);
                let mut content = serde_json::to_string_pretty(entries)
                    .map_err(|err| EditorError::malformed(&path, err.to_string()))?;
                content.push('\n');
                if options.atomic {
                    write_atomic(&dir, &path, content.as_bytes())?;
                } else {
                    fs::write(&path, content).map_err(|err| EditorError::io(&path, err))?;
                }
                debug!("wrote {}", path.display());
                written += 1;
            }
        }
        info!("saved {} file(s) to {}", written, root.display());
        Ok(written)
    }

    /// Adds an empty file to every locale and returns its final name.
    pub fn add_file(&mut self, name: &str) -> EditorResult<String> {
        let name = catalog_file_name(name)?;
        if self.has_file(&name) {
            return Err(EditorError::DuplicateFile(name));
        }
        if self.locales.is_empty() {
            return Err(EditorError::NoLocales);
        }
        for files in self.locales.values_mut() {
            files.insert(name.clone(), Entries::new());
        }
        Ok(name)
    }

    /// Adds `key` with an empty value wherever it is missing. Returns
    /// whether any locale changed.
    pub fn add_key(&mut self, file: &str, key: &str) -> EditorResult<bool> {
        if !self.has_file(file) {
            return Err(EditorError::UnknownFile(file.to_string()));
        }
        if key.trim().is_empty() {
            return Err(EditorError::InvalidName(key.to_string()));
        }
        let mut changed = false;
        for files in self.locales.values_mut() {
            let entries = files.entry(file.to_string()).or_default();
            if !entries.contains_key(key) {
                entries.insert(key.to_string(), String::new());
                changed = true;
            }
        }
        Ok(changed)
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    pub fn locale_count(&self) -> usize {
        self.locales.len()
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    /// Union of file names over all locales.
    pub fn files(&self) -> BTreeSet<&str> {
        self.locales
            .values()
            .flat_map(|files| files.keys().map(String::as_str))
            .collect()
    }

    pub fn has_file(&self, file: &str) -> bool {
        self.locales.values().any(|files| files.contains_key(file))
    }

    /// Union of the keys of `file` over all locales.
    pub fn keys(&self, file: &str) -> BTreeSet<&str> {
        self.locales
            .values()
            .filter_map(|files| files.get(file))
            .flat_map(|entries| entries.keys().map(String::as_str))
            .collect()
    }

    pub fn has_key(&self, file: &str, key: &str) -> bool {
        self.locales
            .values()
            .filter_map(|files| files.get(file))
            .any(|entries| entries.contains_key(key))
    }

    pub fn entries(&self, locale: &str, file: &str) -> Option<&Entries> {
        self.locales.get(locale)?.get(file)
    }

    pub(crate) fn entries_mut(&mut self, locale: &str, file: &str) -> Option<&mut Entries> {
        self.locales.get_mut(locale)?.get_mut(file)
    }

    pub fn value(&self, locale: &str, file: &str, key: &str) -> Option<&str> {
        self.entries(locale, file)?.get(key).map(String::as_str)
    }

    /// Locales that lacked `file` entirely before normalization.
    pub fn absent_locales(&self, file: &str) -> BTreeSet<&str> {
        self.absent
            .get(file)
            .map(|locales| locales.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Forgets the absence record once every file exists on disk.
    pub(crate) fn mark_persisted(&mut self) {
        self.absent.clear();
    }

    #[cfg(test)]
    pub(crate) fn with_file(mut self, locale: &str, file: &str, entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        self.locales
            .entry(locale.to_string())
            .or_default()
            .insert(file.to_string(), map);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_locale(mut self, locale: &str) -> Self {
        self.locales.entry(locale.to_string()).or_default();
        self
    }
}

/// Turns user input into a catalog file name, appending `.json` if needed.
pub fn catalog_file_name(raw: &str) -> EditorResult<String> {
    let name = raw.trim();
    let stem = name.strip_suffix(".json").unwrap_or(name);
    if stem.is_empty() || stem == "." || stem == ".." || name.contains(['/', '\\']) {
        return Err(EditorError::InvalidName(raw.to_string()));
    }
    Ok(format!("{}.{}", stem, CATALOG_EXTENSION))
}

fn read_entries(path: &Path) -> EditorResult<Entries> {
    let content = fs::read_to_string(path).map_err(|err| EditorError::io(path, err))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|err| EditorError::malformed(path, err.to_string()))?;
    let Value::Object(map) = value else {
        return Err(EditorError::malformed(path, "top level is not a JSON object"));
    };

    let mut entries = Entries::new();
    for (key, value) in map {
        match value {
            Value::String(text) => {
                entries.insert(key, text);
            }
            other => {
                return Err(EditorError::malformed(
                    path,
                    format!("value of '{}' is not a string (found {})", key, kind(&other)),
                ));
            }
        }
    }
    Ok(entries)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> EditorResult<()> {
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|err| EditorError::io(dir, err))?;
    temp.write_all(bytes)
        .map_err(|err| EditorError::io(temp.path(), err))?;
    temp.persist(path)
        .map_err(|err| EditorError::io(path, err.error))?;
    Ok(())
}

fn sorted_dir_entries(dir: &Path) -> EditorResult<Vec<std::path::PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| EditorError::io(dir, err))? {
        let entry = entry.map_err(|err| EditorError::io(dir, err))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn utf8_file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(path, content).expect("write file");
    }

    #[test]
    fn load_collects_locales_files_and_keys() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "en/common.json", r#"{"hello": "Hello", "bye": "Bye"}"#);
        write(dir.path(), "fr/common.json", r#"{"hello": "Bonjour"}"#);
        write(dir.path(), "fr/errors.json", r#"{}"#);
        write(dir.path(), "fr/notes.txt", "not a catalog");
        write(dir.path(), "README.md", "not a locale");

        let catalog = Catalog::load(dir.path()).expect("load");
        assert_eq!(catalog.locales().collect::<Vec<_>>(), vec!["en", "fr"]);
        assert_eq!(
            catalog.files().into_iter().collect::<Vec<_>>(),
            vec!["common.json", "errors.json"]
        );
        assert_eq!(
            catalog.keys("common.json").into_iter().collect::<Vec<_>>(),
            vec!["bye", "hello"]
        );
        assert!(catalog.entries("en", "errors.json").is_none());
    }

    #[test]
    fn normalize_fills_files_and_keys() {
        let catalog = Catalog::new()
            .with_file("en", "common.json", &[("hello", "Hello")])
            .with_file("fr", "errors.json", &[("oops", "Oups")])
            .normalize();

        for locale in ["en", "fr"] {
            for file in ["common.json", "errors.json"] {
                assert!(catalog.entries(locale, file).is_some(), "{locale}/{file}");
            }
        }
        assert_eq!(catalog.value("fr", "common.json", "hello"), Some(""));
        assert_eq!(catalog.value("en", "errors.json", "oops"), Some(""));
        assert_eq!(
            catalog.absent_locales("common.json").into_iter().collect::<Vec<_>>(),
            vec!["fr"]
        );
        assert_eq!(
            catalog.absent_locales("errors.json").into_iter().collect::<Vec<_>>(),
            vec!["en"]
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = Catalog::new()
            .with_file("en", "common.json", &[("hello", "Hello")])
            .with_locale("fr")
            .normalize();
        let twice = once.clone().normalize();
        assert_eq!(once, twice);
        assert_eq!(twice.absent_locales("common.json").len(), 1);
    }

    #[test]
    fn load_rejects_non_string_values() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "en/common.json", r#"{"count": 3}"#);
        let err = Catalog::load(dir.path()).unwrap_err();
        match err {
            EditorError::MalformedCatalog { path, reason } => {
                assert!(path.ends_with("en/common.json"));
                assert!(reason.contains("count"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_rejects_invalid_json_and_arrays() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "en/common.json", "{ not json");
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(EditorError::MalformedCatalog { .. })
        ));

        write(dir.path(), "en/common.json", r#"["a"]"#);
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(EditorError::MalformedCatalog { .. })
        ));
    }

    #[test]
    fn load_missing_root_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = Catalog::load(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, EditorError::Io { .. }));
    }

    #[test]
    fn load_honours_ignore_patterns() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "en/common.json", r#"{"a": "A"}"#);
        write(dir.path(), "en/common.bak.json", r#"{"b": "B"}"#);
        write(dir.path(), "_drafts/common.json", r#"{"c": "C"}"#);

        let options = LoadOptions {
            ignore: vec!["*.bak.json".to_string(), "_drafts/".to_string()],
        };
        let catalog = Catalog::load_with(dir.path(), &options).expect("load");
        assert_eq!(catalog.locales().collect::<Vec<_>>(), vec!["en"]);
        assert_eq!(catalog.files().into_iter().collect::<Vec<_>>(), vec!["common.json"]);
    }

    #[test]
    fn save_writes_sorted_pretty_json_and_round_trips() {
        let dir = tempdir().expect("tempdir");
        let catalog = Catalog::new()
            .with_file("en", "common.json", &[("zeta", "Z"), ("alpha", "Ä")])
            .with_locale("fr")
            .normalize();

        let written = catalog
            .save(dir.path(), SaveOptions::default())
            .expect("save");
        assert_eq!(written, 2);

        let content = fs::read_to_string(dir.path().join("en/common.json")).expect("read");
        assert_eq!(content, "{\n  \"alpha\": \"Ä\",\n  \"zeta\": \"Z\"\n}\n");
        let fr = fs::read_to_string(dir.path().join("fr/common.json")).expect("read");
        assert_eq!(fr, "{\n  \"alpha\": \"\",\n  \"zeta\": \"\"\n}\n");

        let reloaded = Catalog::load(dir.path()).expect("reload").normalize();
        assert_eq!(reloaded, catalog);
    }

    #[test]
    fn save_in_place_overwrites_existing_files() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "en/common.json", r#"{"old": "value"}"#);
        let catalog = Catalog::new().with_file("en", "common.json", &[("new", "value")]);
        catalog
            .save(dir.path(), SaveOptions { atomic: false })
            .expect("save");
        let reloaded = Catalog::load(dir.path()).expect("reload");
        assert_eq!(reloaded.value("en", "common.json", "new"), Some("value"));
        assert_eq!(reloaded.value("en", "common.json", "old"), None);
    }

    #[test]
    fn add_file_appends_extension_and_rejects_duplicates() {
        let mut catalog = Catalog::new()
            .with_file("en", "common.json", &[])
            .with_locale("fr")
            .normalize();

        let name = catalog.add_file("errors").expect("add file");
        assert_eq!(name, "errors.json");
        assert!(catalog.entries("en", "errors.json").is_some());
        assert!(catalog.entries("fr", "errors.json").is_some());
        assert!(catalog.absent_locales("errors.json").is_empty());

        let before = catalog.clone();
        assert!(matches!(
            catalog.add_file("common.json"),
            Err(EditorError::DuplicateFile(name)) if name == "common.json"
        ));
        assert_eq!(catalog, before);
    }

    #[test]
    fn add_file_needs_a_locale() {
        let mut catalog = Catalog::new();
        assert!(matches!(catalog.add_file("errors"), Err(EditorError::NoLocales)));
        assert!(!catalog.has_file("errors.json"));
        assert!(matches!(catalog.add_file("errors"), Err(EditorError::NoLocales)));
    }

    #[test]
    fn add_key_is_idempotent() {
        let mut catalog = Catalog::new()
            .with_file("en", "common.json", &[("hello", "Hello")])
            .with_locale("fr")
            .normalize();

        assert!(catalog.add_key("common.json", "bye").expect("add key"));
        let after_first = catalog.clone();
        assert!(!catalog.add_key("common.json", "bye").expect("add key"));
        assert_eq!(catalog, after_first);
        assert_eq!(catalog.value("fr", "common.json", "bye"), Some(""));

        // existing values are never reset
        assert!(!catalog.add_key("common.json", "hello").expect("add key"));
        assert_eq!(catalog.value("en", "common.json", "hello"), Some("Hello"));
    }

    #[test]
    fn add_key_to_unknown_file_fails() {
        let mut catalog = Catalog::new().with_file("en", "common.json", &[]);
        assert!(matches!(
            catalog.add_key("missing.json", "key"),
            Err(EditorError::UnknownFile(_))
        ));
    }

    #[test]
    fn catalog_file_name_validation() {
        assert_eq!(catalog_file_name(" common ").expect("name"), "common.json");
        assert_eq!(catalog_file_name("common.json").expect("name"), "common.json");
        for bad in ["", ".json", "../x", "a/b.json", "a\\b"] {
            assert!(catalog_file_name(bad).is_err(), "{bad}");
        }
    }
}
