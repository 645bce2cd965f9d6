use anyhow::{Result, anyhow};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

mod claude;
mod openai;

pub use claude::Claude;
pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Claude,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => openai::DEFAULT_MODEL,
            ProviderKind::Claude => claude::DEFAULT_MODEL,
        }
    }

    fn key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: ProviderKind,
    pub requested_model: Option<String>,
}

impl ProviderSelection {
    pub fn model(&self) -> String {
        self.requested_model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }
}

/// A function tool the model is forced to call; `parameters` is the JSON
/// schema its arguments must satisfy.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub args: serde_json::Value,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

pub trait Provider: Clone + Send + Sync {
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn register_tool(self, tool: ToolSpec) -> Self;
    fn call_tool(self, tool_name: &str) -> ProviderFuture;
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    OpenAI(OpenAI),
    Claude(Claude),
}

impl Provider for ProviderImpl {
    fn append_system_input(self, input: String) -> Self {
        match self {
            ProviderImpl::OpenAI(provider) => {
                ProviderImpl::OpenAI(provider.append_system_input(input))
            }
            ProviderImpl::Claude(provider) => {
                ProviderImpl::Claude(provider.append_system_input(input))
            }
        }
    }

    fn append_user_input(self, input: String) -> Self {
        match self {
            ProviderImpl::OpenAI(provider) => {
                ProviderImpl::OpenAI(provider.append_user_input(input))
            }
            ProviderImpl::Claude(provider) => {
                ProviderImpl::Claude(provider.append_user_input(input))
            }
        }
    }

    fn register_tool(self, tool: ToolSpec) -> Self {
        match self {
            ProviderImpl::OpenAI(provider) => ProviderImpl::OpenAI(provider.register_tool(tool)),
            ProviderImpl::Claude(provider) => ProviderImpl::Claude(provider.register_tool(tool)),
        }
    }

    fn call_tool(self, tool_name: &str) -> ProviderFuture {
        match self {
            ProviderImpl::OpenAI(provider) => provider.call_tool(tool_name),
            ProviderImpl::Claude(provider) => provider.call_tool(tool_name),
        }
    }
}

pub fn build_provider(
    selection: &ProviderSelection,
    key: String,
    options: RequestOptions,
) -> ProviderImpl {
    let model = selection.model();
    match selection.provider {
        ProviderKind::OpenAI => {
            ProviderImpl::OpenAI(OpenAI::new(key).with_model(model).with_options(options))
        }
        ProviderKind::Claude => {
            ProviderImpl::Claude(Claude::new(key).with_model(model).with_options(options))
        }
    }
}

/// Picks the provider from `--model` first, then from the settings model,
/// then from whichever API key is present in the environment.
pub fn resolve_provider_selection(
    model_arg: Option<&str>,
    settings_model: Option<&str>,
    override_key: Option<&str>,
) -> Result<ProviderSelection> {
    if let Some(model) = model_arg {
        return parse_model_arg(model);
    }
    if let Some(model) = settings_model.filter(|value| !value.trim().is_empty()) {
        return parse_model_arg(model);
    }
    default_provider_selection(override_key)
}

pub fn resolve_key(provider: ProviderKind, override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key.filter(|value| !value.trim().is_empty()) {
        return Ok(key.to_string());
    }
    get_env(provider.key_env()).ok_or_else(|| {
        anyhow!(
            "API key not found for {} (set {} or pass --key)",
            provider.as_str(),
            provider.key_env()
        )
    })
}

fn default_provider_selection(override_key: Option<&str>) -> Result<ProviderSelection> {
    for provider in [ProviderKind::OpenAI, ProviderKind::Claude] {
        if get_env(provider.key_env()).is_some() {
            return Ok(ProviderSelection {
                provider,
                requested_model: None,
            });
        }
    }

    if override_key.is_some() {
        return Ok(ProviderSelection {
            provider: ProviderKind::OpenAI,
            requested_model: None,
        });
    }

    Err(anyhow!(
        "no API keys found (checked OPENAI_API_KEY, ANTHROPIC_API_KEY)"
    ))
}

pub fn parse_model_arg(model_arg: &str) -> Result<ProviderSelection> {
    let raw = model_arg.trim();
    if raw.is_empty() {
        return Err(anyhow!("model argument is empty"));
    }

    if let Some(provider) = provider_from_name(&raw.to_lowercase()) {
        return Ok(ProviderSelection {
            provider,
            requested_model: None,
        });
    }

    if let Some((provider_part, model_part)) = raw.split_once(':')
        && let Some(provider) = provider_from_name(&provider_part.to_lowercase())
    {
        let model = model_part.trim();
        return Ok(ProviderSelection {
            provider,
            requested_model: (!model.is_empty()).then(|| model.to_string()),
        });
    }

    Err(anyhow!(
        "unable to infer provider from model '{}'. Use provider:model (openai:, claude:)",
        raw
    ))
}

fn provider_from_name(name: &str) -> Option<ProviderKind> {
    match name {
        "openai" => Some(ProviderKind::OpenAI),
        "claude" | "anthropic" => Some(ProviderKind::Claude),
        _ => None,
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub(crate) fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(kind) = kind
        && !kind.trim().is_empty()
    {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code
        && !code.trim().is_empty()
    {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_and_model() {
        let selection = parse_model_arg("openai:gpt-4o").expect("selection");
        assert_eq!(selection.provider, ProviderKind::OpenAI);
        assert_eq!(selection.model(), "gpt-4o");

        let selection = parse_model_arg("Anthropic").expect("selection");
        assert_eq!(selection.provider, ProviderKind::Claude);
        assert_eq!(selection.model(), claude::DEFAULT_MODEL);

        let selection = parse_model_arg("claude:").expect("selection");
        assert_eq!(selection.requested_model, None);

        assert!(parse_model_arg("gpt-4o").is_err());
        assert!(parse_model_arg("  ").is_err());
    }

    #[test]
    fn command_line_model_wins_over_settings() {
        let selection =
            resolve_provider_selection(Some("claude:my-model"), Some("openai:gpt-4o"), None)
                .expect("selection");
        assert_eq!(selection.provider, ProviderKind::Claude);
        assert_eq!(selection.model(), "my-model");

        let selection =
            resolve_provider_selection(None, Some("openai:gpt-4o"), None).expect("selection");
        assert_eq!(selection.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn explicit_key_is_used_verbatim() {
        assert_eq!(
            resolve_key(ProviderKind::OpenAI, Some("sk-test")).expect("key"),
            "sk-test"
        );
    }

    #[test]
    fn error_parts_are_joined() {
        assert_eq!(
            format_error_parts(
                Some("bad request".to_string()),
                Some("invalid_request_error".to_string()),
                None
            ),
            "bad request | type: invalid_request_error"
        );
        assert_eq!(format_error_parts(None, None, None), "unknown error");
    }
}
