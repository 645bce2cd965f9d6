use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EditorError, EditorResult};

/// What the editor remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_folder: Option<PathBuf>,
}

impl SessionState {
    /// A missing file is an empty state; an unreadable one is an error.
    pub fn load(path: &Path) -> EditorResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|err| EditorError::io(path, err))?;
        serde_json::from_str(&content).map_err(|err| EditorError::SessionState {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> EditorResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| EditorError::io(dir, err))?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|err| EditorError::SessionState {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        fs::write(path, content).map_err(|err| EditorError::io(path, err))?;
        debug!("session state written to {}", path.display());
        Ok(())
    }
}
