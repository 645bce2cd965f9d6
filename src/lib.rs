use anyhow::{Context, Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub mod analyzer;
pub mod catalog;
pub mod edit;
pub mod error;
pub mod generator;
pub mod languages;
pub mod logging;
mod paths;
pub mod providers;
pub mod report;
pub mod session;
pub mod settings;
pub mod state;
#[cfg(test)]
mod test_util;

pub use catalog::Catalog;
pub use error::{EditorError, EditorResult};
pub use generator::{GenerationRequest, Generator};
pub use providers::{Claude, OpenAI, Provider, ProviderKind};
pub use session::{SaveOutcome, Session};
pub use settings::Settings;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub root: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub verbose: bool,
}

/// A user action, independent of how it was entered.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open {
        root: String,
    },
    Overview,
    Stats {
        file: String,
    },
    Show {
        file: String,
    },
    AddFile {
        name: String,
    },
    AddKey {
        file: String,
        key: String,
    },
    Edit {
        file: String,
        key: String,
        rename: Option<String>,
        values: BTreeMap<String, String>,
    },
    Generate {
        file: String,
        key: String,
        source_locale: String,
        context: Option<String>,
        targets: Option<BTreeSet<String>>,
        overwrite: bool,
    },
    Save,
    Status,
}

impl Action {
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Action::AddFile { .. }
                | Action::AddKey { .. }
                | Action::Edit { .. }
                | Action::Generate { .. }
        )
    }
}

/// Routes actions to the session and the generator.
#[derive(Debug)]
pub struct Editor {
    config: Config,
    settings: Settings,
    registry: languages::LanguageRegistry,
    session: Session,
}

impl Editor {
    pub fn new(config: Config) -> Result<Self> {
        let settings_path = config.settings_path.as_deref().map(Path::new);
        let settings = settings::load_settings(settings_path)?;
        let session = Session::new(&settings);
        Self::from_parts(config, settings, session)
    }

    pub fn from_parts(config: Config, settings: Settings, session: Session) -> Result<Self> {
        let registry = languages::LanguageRegistry::load()?;
        Ok(Self {
            config,
            settings,
            registry,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Opens `--root`, or the remembered folder, unless a folder is open.
    pub fn ensure_open(&mut self) -> Result<()> {
        if self.session.root().is_some() {
            return Ok(());
        }
        let root = match self.config.root.as_deref().and_then(paths::normalize_dir) {
            Some(root) => root,
            None => self
                .session
                .remembered_folder()?
                .ok_or(EditorError::NoFolder)
                .with_context(|| "pass --root <dir> or run `open <dir>` first")?,
        };
        self.session.open(&root)?;
        Ok(())
    }

    pub async fn dispatch(&mut self, action: Action) -> Result<String> {
        if !matches!(action, Action::Open { .. }) {
            self.ensure_open()?;
        }
        match action {
            Action::Open { root } => {
                let root =
                    paths::normalize_dir(&root).ok_or_else(|| anyhow!("folder path is empty"))?;
                self.session.open(&root)?;
                self.config.root = self
                    .session
                    .root()
                    .map(|root| root.to_string_lossy().to_string());
                let overview = analyzer::catalog_overview(self.session.catalog())?;
                Ok(report::format_overview(&overview))
            }
            Action::Overview => {
                let overview = analyzer::catalog_overview(self.session.catalog())?;
                Ok(report::format_overview(&overview))
            }
            Action::Stats { file } => {
                let catalog = self.session.catalog();
                let stats = analyzer::file_stats(catalog, &file)?;
                let mut output = report::format_stats(&stats);
                let missing = analyzer::missing_locales(catalog, &file)?;
                if !missing.is_empty() {
                    let missing = missing.into_iter().collect::<Vec<_>>().join(", ");
                    output.push_str(&format!("\nMissing in: {}", missing));
                }
                Ok(output)
            }
            Action::Show { file } => {
                let table = analyzer::file_table(self.session.catalog(), &file)?;
                Ok(report::format_table(&table))
            }
            Action::AddFile { name } => {
                let name = self.session.add_file(&name)?;
                Ok(format!("added {}", name))
            }
            Action::AddKey { file, key } => {
                if self.session.add_key(&file, &key)? {
                    Ok(format!("added {} to {}", key, file))
                } else {
                    Ok(format!("{} already exists in {}", key, file))
                }
            }
            Action::Edit {
                file,
                key,
                rename,
                values,
            } => {
                let new_key = rename.unwrap_or_else(|| key.clone());
                self.session.edit_key(&file, &key, &new_key, &values)?;
                if new_key == key {
                    Ok(format!("updated {} in {}", key, file))
                } else {
                    Ok(format!("renamed {} to {} in {}", key, new_key, file))
                }
            }
            Action::Generate {
                file,
                key,
                source_locale,
                context,
                targets,
                overwrite,
            } => {
                self.generate(&file, &key, &source_locale, context, targets, overwrite)
                    .await
            }
            Action::Save => {
                let outcome = self.session.save()?;
                Ok(report::format_save(outcome))
            }
            Action::Status => Ok(self.status()),
        }
    }

    async fn generate(
        &mut self,
        file: &str,
        key: &str,
        source_locale: &str,
        context: Option<String>,
        targets: Option<BTreeSet<String>>,
        overwrite: bool,
    ) -> Result<String> {
        let request = self.generation_request(file, key, source_locale, context, targets)?;
        let provider = self.build_provider()?;
        self.generate_with(provider, file, key, &request, overwrite).await
    }

    /// Builds the request for `key` from its `source_locale` value.
    pub fn generation_request(
        &self,
        file: &str,
        key: &str,
        source_locale: &str,
        context: Option<String>,
        targets: Option<BTreeSet<String>>,
    ) -> Result<GenerationRequest> {
        let phrase = self.source_phrase(file, key, source_locale)?;
        let mut request = GenerationRequest::new(phrase, source_locale).with_context(context);
        if let Some(targets) = targets {
            request = request.with_targets(targets);
        }
        Ok(request)
    }

    /// Generates with `provider` and merges the answer into `file`/`key`.
    /// A failed generation leaves the catalog untouched.
    pub async fn generate_with<P: Provider>(
        &mut self,
        provider: P,
        file: &str,
        key: &str,
        request: &GenerationRequest,
        overwrite: bool,
    ) -> Result<String> {
        let generator =
            Generator::new(provider, self.registry.clone(), self.settings.locales.clone());
        let generated = generator.generate(request).await?;

        let updated = self
            .session
            .merge_generated(file, key, &generated.translations, overwrite)?;
        Ok(report::format_generation(&generated, &updated, &self.registry))
    }

    fn source_phrase(&self, file: &str, key: &str, source_locale: &str) -> Result<String> {
        let catalog = self.session.catalog();
        if !catalog.has_file(file) {
            return Err(EditorError::UnknownFile(file.to_string()).into());
        }
        if !catalog.has_locale(source_locale) {
            return Err(EditorError::UnknownLocale(source_locale.to_string()).into());
        }
        let phrase = catalog.value(source_locale, file, key).ok_or_else(|| {
            EditorError::UnknownKey {
                file: file.to_string(),
                key: key.to_string(),
            }
        })?;
        if phrase.trim().is_empty() {
            return Err(EditorError::Generation(format!(
                "'{}' has no '{}' value to translate from",
                key, source_locale
            ))
            .into());
        }
        Ok(phrase.to_string())
    }

    fn build_provider(&self) -> Result<providers::ProviderImpl> {
        let selection = providers::resolve_provider_selection(
            self.config.model.as_deref(),
            self.settings.model.as_deref(),
            self.config.key.as_deref(),
        )
        .map_err(|err| EditorError::Configuration(err.to_string()))?;
        let key = providers::resolve_key(selection.provider, self.config.key.as_deref())
            .map_err(|err| EditorError::Configuration(err.to_string()))?;
        let options = providers::RequestOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        Ok(providers::build_provider(&selection, key, options))
    }

    fn status(&self) -> String {
        let root = self
            .session
            .root()
            .map(|root| root.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        let catalog = self.session.catalog();
        format!(
            "folder: {}\nlocales: {}\nfiles: {}\nunsaved changes: {}",
            root,
            catalog.locales().collect::<Vec<_>>().join(", "),
            catalog.files().len(),
            if self.session.is_dirty() { "yes" } else { "no" }
        )
    }
}

/// Runs one action; mutating actions are saved before returning.
pub async fn run(config: Config, action: Action) -> Result<String> {
    let mut editor = Editor::new(config)?;
    let mutates = action.mutates();
    let mut output = editor.dispatch(action).await?;
    if mutates && editor.session().is_dirty() {
        let saved = editor.dispatch(Action::Save).await?;
        output.push('\n');
        output.push_str(&saved);
    }
    Ok(output)
}

/// Parses `locale=value` pairs as given to `edit --set`.
pub fn parse_locale_values(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for pair in pairs {
        let (locale, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected locale=value, got '{}'", pair))?;
        let locale = locale.trim();
        if locale.is_empty() {
            return Err(anyhow!("expected locale=value, got '{}'", pair));
        }
        values.insert(locale.to_string(), value.to_string());
    }
    Ok(values)
}
