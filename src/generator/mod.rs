//! Machine translation of one phrase into many locales.
//!
//! The request is a forced tool call whose argument schema has exactly one
//! string property per target locale, so a well-behaved model can only
//! answer with the complete mapping. The answer is still checked here.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};
use tera::{Context as TeraContext, Tera};
use tracing::info;

use crate::error::{EditorError, EditorResult};
use crate::languages::LanguageRegistry;
use crate::providers::{Provider, ProviderUsage, ToolSpec};

pub const TOOL_NAME: &str = "deliver_translations";

pub const SUPPORTED_LOCALES: [&str; 23] = [
    "ar", "bn", "ca", "de", "en", "es", "fi", "fr", "he", "id", "it", "ja", "ko", "pl", "pt",
    "ro", "ru", "si", "sv", "te", "tr", "vi", "zh",
];

const SYSTEM_PROMPT: &str =
    "You are an assistant that provides translations of a given phrase into multiple languages.";
const USER_PROMPT_TEMPLATE: &str = include_str!("prompts/user_prompt.tera");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub phrase: String,
    pub source_locale: String,
    pub context: Option<String>,
    /// `None` means every supported locale except the source.
    pub target_locales: Option<BTreeSet<String>>,
}

impl GenerationRequest {
    pub fn new(phrase: impl Into<String>, source_locale: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            source_locale: source_locale.into(),
            context: None,
            target_locales: None,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|value| !value.trim().is_empty());
        self
    }

    pub fn with_targets(mut self, targets: BTreeSet<String>) -> Self {
        self.target_locales = Some(targets);
        self
    }

    pub fn targets(&self, supported: &[String]) -> BTreeSet<String> {
        let source = self.source_locale.trim();
        match &self.target_locales {
            Some(targets) => targets
                .iter()
                .filter(|code| !code.eq_ignore_ascii_case(source))
                .cloned()
                .collect(),
            None => supported
                .iter()
                .filter(|code| !code.eq_ignore_ascii_case(source))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedTranslations {
    pub translations: BTreeMap<String, String>,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone)]
pub struct Generator<P: Provider> {
    provider: P,
    registry: LanguageRegistry,
    supported: Vec<String>,
}

impl<P: Provider> Generator<P> {
    pub fn new(provider: P, registry: LanguageRegistry, supported: Vec<String>) -> Self {
        Self {
            provider,
            registry,
            supported,
        }
    }

    pub fn supported_locales(&self) -> &[String] {
        &self.supported
    }

    /// Runs one generation. Nothing is retried; any failure is a
    /// [`EditorError::Generation`].
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> EditorResult<GeneratedTranslations> {
        let targets = self.validate(request)?;
        let prompt = render_prompt(request, &targets)?;
        info!(
            "generating {} translation(s) from '{}'",
            targets.len(),
            request.source_locale
        );

        let response = self
            .provider
            .clone()
            .register_tool(tool_spec(&targets))
            .append_system_input(SYSTEM_PROMPT.to_string())
            .append_user_input(prompt)
            .call_tool(TOOL_NAME)
            .await
            .map_err(|err| EditorError::Generation(format!("{:#}", err)))?;

        let translations = parse_generated(response.args, &targets)?;
        Ok(GeneratedTranslations {
            translations,
            model: response.model,
            usage: response.usage,
        })
    }

    fn validate(&self, request: &GenerationRequest) -> EditorResult<BTreeSet<String>> {
        if request.phrase.trim().is_empty() {
            return Err(EditorError::Generation("phrase is empty".to_string()));
        }
        if !self.registry.is_valid_code(&request.source_locale) {
            return Err(EditorError::Generation(format!(
                "invalid source locale '{}' (expected an ISO 639-1 code)",
                request.source_locale
            )));
        }
        let targets = request.targets(&self.supported);
        if targets.is_empty() {
            return Err(EditorError::Generation(
                "no target locales to generate".to_string(),
            ));
        }
        if let Some(code) = targets
            .iter()
            .find(|code| !self.registry.is_valid_code(code))
        {
            return Err(EditorError::Generation(format!(
                "invalid target locale '{}' (expected an ISO 639-1 code)",
                code
            )));
        }
        Ok(targets)
    }
}

/// One required string property per target, nothing else allowed.
pub fn response_schema(targets: &BTreeSet<String>) -> Value {
    let properties = targets
        .iter()
        .map(|code| (code.clone(), json!({"type": "string"})))
        .collect::<serde_json::Map<_, _>>();
    json!({
        "additionalProperties": false,
        "properties": properties,
        "required": targets.iter().collect::<Vec<_>>(),
        "type": "object"
    })
}

pub fn tool_spec(targets: &BTreeSet<String>) -> ToolSpec {
    ToolSpec {
        name: TOOL_NAME.to_string(),
        description: "Return the phrase translated into every requested locale.".to_string(),
        parameters: response_schema(targets),
    }
}

pub fn render_prompt(
    request: &GenerationRequest,
    targets: &BTreeSet<String>,
) -> EditorResult<String> {
    let mut context = TeraContext::new();
    context.insert("phrase", request.phrase.trim());
    context.insert("source_locale", request.source_locale.trim());
    context.insert("context", &request.context);
    context.insert("targets", &targets.iter().collect::<Vec<_>>());
    context.insert("tool_name", TOOL_NAME);

    Tera::one_off(USER_PROMPT_TEMPLATE, &context, false)
        .map(|prompt| prompt.trim_end().to_string())
        .map_err(|err| EditorError::Generation(format!("failed to render prompt: {}", err)))
}

/// Checks that `args` maps exactly the requested targets to strings.
pub fn parse_generated(
    args: Value,
    targets: &BTreeSet<String>,
) -> EditorResult<BTreeMap<String, String>> {
    let Value::Object(map) = args else {
        return Err(EditorError::Generation(
            "response is not a JSON object".to_string(),
        ));
    };
    if let Some(extra) = map.keys().find(|code| !targets.contains(*code)) {
        return Err(EditorError::Generation(format!(
            "response contains unexpected locale '{}'",
            extra
        )));
    }

    let mut translations = BTreeMap::new();
    for code in targets {
        match map.get(code) {
            Some(Value::String(text)) => {
                translations.insert(code.clone(), text.clone());
            }
            Some(_) => {
                return Err(EditorError::Generation(format!(
                    "translation for '{}' is not a string",
                    code
                )));
            }
            None => {
                return Err(EditorError::Generation(format!(
                    "response is missing locale '{}'",
                    code
                )));
            }
        }
    }
    Ok(translations)
}

pub fn default_supported_locales() -> Vec<String> {
    SUPPORTED_LOCALES.iter().map(|code| code.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeProvider;
    use insta::assert_json_snapshot;

    fn generator(provider: FakeProvider) -> Generator<FakeProvider> {
        Generator::new(
            provider,
            LanguageRegistry::load().expect("registry"),
            default_supported_locales(),
        )
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|code| code.to_string()).collect()
    }

    #[test]
    fn default_targets_exclude_the_source() {
        let request = GenerationRequest::new("Hello", "en");
        let targets = request.targets(&default_supported_locales());
        assert_eq!(targets.len(), 22);
        assert!(!targets.contains("en"));
        assert!(targets.contains("zh"));
    }

    #[test]
    fn schema_requires_exactly_the_targets() {
        assert_json_snapshot!(response_schema(&set(&["de", "fr"])), @r#"
        {
          "additionalProperties": false,
          "properties": {
            "de": {
              "type": "string"
            },
            "fr": {
              "type": "string"
            }
          },
          "required": [
            "de",
            "fr"
          ],
          "type": "object"
        }
        "#);
    }

    #[test]
    fn prompt_lists_targets_and_context() {
        let request = GenerationRequest::new("Save changes", "en")
            .with_context(Some("button label".to_string()));
        let prompt = render_prompt(&request, &set(&["de", "fr"])).expect("prompt");
        assert!(prompt.contains("a phrase in 'en'"));
        assert!(prompt.contains("target languages: de, fr, identified"));
        assert!(prompt.contains("Phrase: \"Save changes\""));
        assert!(prompt.contains("Context: button label"));
        assert!(
            prompt.contains("  \"de\": \"translation in de\",\n  \"fr\": \"translation in fr\",\n}")
        );

        let request =
            GenerationRequest::new("Save changes", "en").with_context(Some(" ".to_string()));
        let prompt = render_prompt(&request, &set(&["de"])).expect("prompt");
        assert!(prompt.contains("No additional context provided."));
    }

    #[test]
    fn parse_rejects_missing_extra_and_non_string_codes() {
        let targets = set(&["de", "fr"]);
        assert!(parse_generated(json!({"de": "Hallo"}), &targets).is_err());
        assert!(
            parse_generated(
                json!({"de": "Hallo", "fr": "Bonjour", "es": "Hola"}),
                &targets
            )
            .is_err()
        );
        assert!(parse_generated(json!({"de": "Hallo", "fr": 1}), &targets).is_err());
        assert!(parse_generated(json!(["Hallo"]), &targets).is_err());

        let parsed =
            parse_generated(json!({"de": "Hallo", "fr": "Bonjour"}), &targets).expect("parsed");
        assert_eq!(parsed.get("fr").map(String::as_str), Some("Bonjour"));
    }

    #[tokio::test]
    async fn generate_returns_requested_translations() {
        let provider = FakeProvider::answering(json!({"de": "Hallo", "fr": "Bonjour"}));
        let seen = provider.seen.clone();
        let request =
            GenerationRequest::new("Hello", "en").with_targets(set(&["de", "fr", "en"]));

        let generated = generator(provider).generate(&request).await.expect("generate");
        assert_eq!(generated.translations.len(), 2);
        assert_eq!(generated.model.as_deref(), Some("fake-model"));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen[0], SYSTEM_PROMPT);
        assert!(seen[1].contains("Phrase: \"Hello\""));
    }

    #[tokio::test]
    async fn upstream_failure_is_a_generation_error() {
        let request = GenerationRequest::new("Hello", "en").with_targets(set(&["fr"]));
        let err = generator(FakeProvider::failing("OpenAI API error (500)"))
            .generate(&request)
            .await
            .unwrap_err();
        match err {
            EditorError::Generation(message) => assert!(message.contains("500")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invalid_requests_fail_before_calling_the_provider() {
        let provider = FakeProvider::answering(json!({}));
        let seen = provider.seen.clone();
        let generator = generator(provider);

        for request in [
            GenerationRequest::new("  ", "en"),
            GenerationRequest::new("Hello", "klingon"),
            GenerationRequest::new("Hello", "en").with_targets(set(&["en"])),
            GenerationRequest::new("Hello", "en").with_targets(set(&["xx"])),
        ] {
            assert!(matches!(
                generator.generate(&request).await,
                Err(EditorError::Generation(_))
            ));
        }
        assert!(seen.lock().expect("lock").is_empty());
    }
}
