use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::{Catalog, LoadOptions, SaveOptions};
use crate::edit;
use crate::error::{EditorError, EditorResult};
use crate::paths;
use crate::settings::Settings;
use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { files: usize },
    NothingToSave,
}

/// The one editing session: the open folder, its catalog and whether the
/// catalog has changes that are not on disk yet.
#[derive(Debug)]
pub struct Session {
    root: Option<PathBuf>,
    catalog: Catalog,
    dirty: bool,
    load_options: LoadOptions,
    save_options: SaveOptions,
    state_path: Option<PathBuf>,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        Self {
            root: None,
            catalog: Catalog::new(),
            dirty: false,
            load_options: LoadOptions {
                ignore: settings.ignore.clone(),
            },
            save_options: SaveOptions {
                atomic: settings.atomic_save,
            },
            state_path: paths::session_state_path(),
        }
    }

    /// Where the last opened folder is remembered; `None` disables it.
    pub fn with_state_path(mut self, path: Option<PathBuf>) -> Self {
        self.state_path = path;
        self
    }

    pub fn remembered_folder(&self) -> EditorResult<Option<PathBuf>> {
        match &self.state_path {
            Some(path) => Ok(SessionState::load(path)?.last_folder),
            None => Ok(None),
        }
    }

    /// Loads `root` and replaces the current catalog. Unsaved changes are
    /// discarded; on error the current session is left as it was.
    ///
    /// Relative roots are resolved against the working directory, so the
    /// remembered folder stays valid from anywhere.
    pub fn open(&mut self, root: &Path) -> EditorResult<()> {
        let root = std::path::absolute(root).map_err(|err| EditorError::io(root, err))?;
        let catalog = Catalog::open(&root, &self.load_options)?;
        if self.dirty {
            warn!("discarding unsaved changes in {:?}", self.root);
        }
        info!("opened {}", root.display());
        self.remember_folder(&root);
        self.root = Some(root);
        self.catalog = catalog;
        self.clear_dirty();
        Ok(())
    }

    fn remember_folder(&self, root: &Path) {
        let Some(path) = &self.state_path else {
            return;
        };
        let mut state = match SessionState::load(path) {
            Ok(state) => state,
            Err(err) => {
                warn!("{}; starting a new session state", err);
                SessionState::default()
            }
        };
        if state.last_folder.as_deref() == Some(root) {
            return;
        }
        state.last_folder = Some(root.to_path_buf());
        if let Err(err) = state.save(path) {
            warn!("failed to remember folder: {}", err);
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Writes the whole catalog when there are unsaved changes.
    pub fn save(&mut self) -> EditorResult<SaveOutcome> {
        let root = self.require_root()?.to_path_buf();
        if !self.dirty {
            return Ok(SaveOutcome::NothingToSave);
        }
        let files = self.catalog.save(&root, self.save_options)?;
        self.catalog.mark_persisted();
        self.clear_dirty();
        Ok(SaveOutcome::Saved { files })
    }

    pub fn add_file(&mut self, name: &str) -> EditorResult<String> {
        self.require_root()?;
        let name = self.catalog.add_file(name)?;
        self.mark_dirty();
        Ok(name)
    }

    pub fn add_key(&mut self, file: &str, key: &str) -> EditorResult<bool> {
        self.require_root()?;
        let changed = self.catalog.add_key(file, key)?;
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    pub fn edit_key(
        &mut self,
        file: &str,
        old_key: &str,
        new_key: &str,
        values_by_locale: &BTreeMap<String, String>,
    ) -> EditorResult<()> {
        self.require_root()?;
        edit::rename_or_edit_key(&mut self.catalog, file, old_key, new_key, values_by_locale)?;
        self.mark_dirty();
        Ok(())
    }

    pub fn merge_generated(
        &mut self,
        file: &str,
        key: &str,
        generated: &BTreeMap<String, String>,
        overwrite: bool,
    ) -> EditorResult<Vec<String>> {
        self.require_root()?;
        let updated =
            edit::merge_generated_translations(&mut self.catalog, file, key, generated, overwrite)?;
        if !updated.is_empty() {
            self.mark_dirty();
        }
        Ok(updated)
    }

    fn require_root(&self) -> EditorResult<&Path> {
        self.root.as_deref().ok_or(EditorError::NoFolder)
    }
}
