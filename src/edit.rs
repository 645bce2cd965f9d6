use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{EditorError, EditorResult};

/// Sets `new_key` in every locale of `file` and, when it differs from
/// `old_key`, removes `old_key` everywhere.
///
/// Locales missing from `values_by_locale` keep their current value of
/// `old_key`. All checks run before the first write, so on error the
/// catalog is unchanged.
pub fn rename_or_edit_key(
    catalog: &mut Catalog,
    file: &str,
    old_key: &str,
    new_key: &str,
    values_by_locale: &BTreeMap<String, String>,
) -> EditorResult<()> {
    ensure_key(catalog, file, old_key)?;
    if new_key.trim().is_empty() {
        return Err(EditorError::InvalidName(new_key.to_string()));
    }
    if let Some(locale) = values_by_locale
        .keys()
        .find(|locale| !catalog.has_locale(locale))
    {
        return Err(EditorError::UnknownLocale(locale.clone()));
    }

    let renamed = new_key != old_key;
    if renamed {
        let colliding = catalog
            .locales()
            .filter(|locale| {
                catalog
                    .entries(locale, file)
                    .is_some_and(|entries| entries.contains_key(new_key))
            })
            .map(str::to_string)
            .collect::<Vec<_>>();
        if !colliding.is_empty() {
            return Err(EditorError::KeyCollision {
                file: file.to_string(),
                key: new_key.to_string(),
                locales: colliding,
            });
        }
    }

    let locales = catalog.locales().map(str::to_string).collect::<Vec<_>>();
    for locale in locales {
        let Some(entries) = catalog.entries_mut(&locale, file) else {
            continue;
        };
        let value = match values_by_locale.get(&locale) {
            Some(value) => value.clone(),
            None => entries.get(old_key).cloned().unwrap_or_default(),
        };
        if renamed {
            entries.remove(old_key);
        }
        entries.insert(new_key.to_string(), value);
    }
    debug!("applied edit {}:{} -> {}", file, old_key, new_key);
    Ok(())
}

/// Copies generated translations of `key` into the catalog.
///
/// A locale is written only when `overwrite` is set or its current value is
/// empty. Locales the catalog does not have are skipped. Returns the
/// locales that changed.
pub fn merge_generated_translations(
    catalog: &mut Catalog,
    file: &str,
    key: &str,
    generated: &BTreeMap<String, String>,
    overwrite: bool,
) -> EditorResult<Vec<String>> {
    ensure_key(catalog, file, key)?;

    let mut updated = Vec::new();
    for (locale, translation) in generated {
        let Some(entries) = catalog.entries_mut(locale, file) else {
            debug!("skipping generated '{}': locale not in catalog", locale);
            continue;
        };
        let current = entries.get(key).map(String::as_str).unwrap_or_default();
        if !overwrite && !current.is_empty() {
            continue;
        }
        if current == translation.as_str() {
            continue;
        }
        entries.insert(key.to_string(), translation.clone());
        updated.push(locale.clone());
    }
    Ok(updated)
}

fn ensure_key(catalog: &Catalog, file: &str, key: &str) -> EditorResult<()> {
    if !catalog.has_file(file) {
        return Err(EditorError::UnknownFile(file.to_string()));
    }
    if !catalog.has_key(file, key) {
        return Err(EditorError::UnknownKey {
            file: file.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}
