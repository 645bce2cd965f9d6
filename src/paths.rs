use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "LOCALE_EDITOR_DIR";
const SESSION_FILE_NAME: &str = "session.json";

/// `$LOCALE_EDITOR_DIR`, else `~/.locale-catalog-editor`.
pub(crate) fn base_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
    {
        return Some(dir);
    }
    home().map(|home| home.join(".locale-catalog-editor"))
}

pub(crate) fn session_state_path() -> Option<PathBuf> {
    base_dir().map(|dir| dir.join(SESSION_FILE_NAME))
}

/// Expands `~` and drops redundant separators from a user supplied folder.
pub fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed);
    Some(Path::new(&expanded).components().collect())
}

fn home() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(PathBuf::from(home))
        }
    })
}

fn expand_tilde(value: &str) -> String {
    if value != "~" && !value.starts_with("~/") {
        return value.to_string();
    }
    match home() {
        Some(home) => format!("{}{}", home.display(), &value[1..]),
        None => value.to_string(),
    }
}
