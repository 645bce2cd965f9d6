//! Completion statistics over a normalized catalog.
//!
//! Counts are per cell: one unit per (key, locale) pair.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::{EditorError, EditorResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FileStats {
    pub total_keys: usize,
    pub empty_keys: usize,
    pub filled_keys: usize,
    pub completion_percentage: f64,
}

impl FileStats {
    pub fn from_counts(total_keys: usize, empty_keys: usize) -> Self {
        let filled_keys = total_keys.saturating_sub(empty_keys);
        let completion_percentage = if total_keys == 0 {
            0.0
        } else {
            filled_keys as f64 / total_keys as f64 * 100.0
        };
        Self {
            total_keys,
            empty_keys,
            filled_keys,
            completion_percentage,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_keys > 0 && self.empty_keys == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: String,
    /// One value per locale, in the table's locale order.
    pub values: Vec<String>,
    pub empty_locales: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTable {
    pub file: String,
    pub locales: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOverview {
    pub file: String,
    pub stats: FileStats,
    pub missing_locales: BTreeSet<String>,
}

pub fn file_stats(catalog: &Catalog, file: &str) -> EditorResult<FileStats> {
    let table = file_table(catalog, file)?;
    let total = table.rows.len() * table.locales.len();
    let empty = table
        .rows
        .iter()
        .map(|row| row.empty_locales.len())
        .sum();
    Ok(FileStats::from_counts(total, empty))
}

/// Locales whose copy of `file` did not exist before normalization.
pub fn missing_locales(catalog: &Catalog, file: &str) -> EditorResult<BTreeSet<String>> {
    ensure_file(catalog, file)?;
    Ok(catalog
        .absent_locales(file)
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// Every key of `file` across locales, with each locale's value (`""` when
/// the locale has no entry).
pub fn file_table(catalog: &Catalog, file: &str) -> EditorResult<FileTable> {
    ensure_file(catalog, file)?;
    let locales = catalog.locales().map(str::to_string).collect::<Vec<_>>();
    let rows = catalog
        .keys(file)
        .into_iter()
        .map(|key| {
            let mut values = Vec::with_capacity(locales.len());
            let mut empty_locales = BTreeSet::new();
            for locale in &locales {
                let value = catalog.value(locale, file, key).unwrap_or_default();
                if value.is_empty() {
                    empty_locales.insert(locale.clone());
                }
                values.push(value.to_string());
            }
            TableRow {
                key: key.to_string(),
                values,
                empty_locales,
            }
        })
        .collect();
    Ok(FileTable {
        file: file.to_string(),
        locales,
        rows,
    })
}

pub fn catalog_overview(catalog: &Catalog) -> EditorResult<Vec<FileOverview>> {
    catalog
        .files()
        .into_iter()
        .map(|file| {
            Ok(FileOverview {
                file: file.to_string(),
                stats: file_stats(catalog, file)?,
                missing_locales: missing_locales(catalog, file)?,
            })
        })
        .collect()
}

fn ensure_file(catalog: &Catalog, file: &str) -> EditorResult<()> {
    if catalog.has_file(file) {
        Ok(())
    } else {
        Err(EditorError::UnknownFile(file.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Catalog {
        Catalog::new()
            .with_file("en", "common.json", &[("hello", "Hello")])
            .with_locale("fr")
            .normalize()
    }

    #[test]
    fn missing_file_counts_as_empty_cells() {
        let catalog = scenario();
        assert_eq!(
            missing_locales(&catalog, "common.json").expect("missing"),
            BTreeSet::from(["fr".to_string()])
        );
        let stats = file_stats(&catalog, "common.json").expect("stats");
        assert_eq!(stats.total_keys, 2);
        assert_eq!(stats.empty_keys, 1);
        assert_eq!(stats.filled_keys, 1);
        assert_eq!(stats.completion_percentage, 50.0);
        assert!(!stats.is_complete());
    }

    #[test]
    fn empty_file_has_zero_completion() {
        let catalog = Catalog::new()
            .with_file("en", "empty.json", &[])
            .with_locale("fr")
            .normalize();
        let stats = file_stats(&catalog, "empty.json").expect("stats");
        assert_eq!(stats, FileStats::from_counts(0, 0));
        assert_eq!(stats.completion_percentage, 0.0);
    }

    #[test]
    fn fully_translated_file_is_complete() {
        let catalog = Catalog::new()
            .with_file("en", "common.json", &[("a", "A"), ("b", "B")])
            .with_file("fr", "common.json", &[("a", "A fr"), ("b", "B fr")])
            .normalize();
        let stats = file_stats(&catalog, "common.json").expect("stats");
        assert_eq!(stats.completion_percentage, 100.0);
        assert!(stats.is_complete());
        assert!(missing_locales(&catalog, "common.json").expect("missing").is_empty());
    }

    #[test]
    fn table_keys_are_the_union_across_locales() {
        let catalog = Catalog::new()
            .with_file("en", "common.json", &[("a", "A")])
            .with_file("fr", "common.json", &[("b", "B")])
            .with_file("de", "common.json", &[("c", "")]);
        let table = file_table(&catalog, "common.json").expect("table");
        assert_eq!(table.locales, vec!["de", "en", "fr"]);
        let keys = table.rows.iter().map(|row| row.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0].values, vec!["", "A", ""]);
        assert_eq!(
            table.rows[2].empty_locales,
            BTreeSet::from(["de".to_string(), "en".to_string(), "fr".to_string()])
        );
    }

    #[test]
    fn completion_stays_within_bounds() {
        for (total, empty) in [(0, 0), (1, 0), (1, 1), (3, 1), (7, 7)] {
            let stats = FileStats::from_counts(total, empty);
            assert!((0.0..=100.0).contains(&stats.completion_percentage));
            assert_eq!(
                stats.completion_percentage == 100.0,
                total > 0 && empty == 0
            );
        }
    }

    #[test]
    fn unknown_file_is_reported() {
        let catalog = scenario();
        assert!(matches!(
            file_stats(&catalog, "nope.json"),
            Err(EditorError::UnknownFile(_))
        ));
    }

    #[test]
    fn overview_lists_every_file() {
        let catalog = Catalog::new()
            .with_file("en", "a.json", &[("k", "v")])
            .with_file("fr", "b.json", &[])
            .normalize();
        let overview = catalog_overview(&catalog).expect("overview");
        let files = overview.iter().map(|item| item.file.as_str()).collect::<Vec<_>>();
        assert_eq!(files, vec!["a.json", "b.json"]);
        assert_eq!(
            overview[0].missing_locales,
            BTreeSet::from(["fr".to_string()])
        );
        assert_eq!(overview[0].stats.completion_percentage, 50.0);
    }
}
