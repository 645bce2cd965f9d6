use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    Message, MessageRole, Provider, ProviderFuture, ProviderResponse, ProviderUsage,
    RequestOptions, ToolSpec, format_error_parts,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
pub(crate) const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct Claude {
    key: String,
    model: String,
    options: RequestOptions,
    messages: Vec<Message>,
    tools: Vec<ToolSpec>,
}

impl Claude {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            options: RequestOptions::default(),
            messages: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    fn find_tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    fn request_body(&self, tool: &ToolSpec) -> serde_json::Value {
        let (system_inputs, user_inputs): (Vec<&Message>, Vec<&Message>) = self
            .messages
            .iter()
            .partition(|message| message.role == MessageRole::System);

        let system = system_inputs
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let messages = user_inputs
            .iter()
            .map(|message| {
                json!({
                    "role": "user",
                    "content": [{"type": "text", "text": message.content}]
                })
            })
            .collect::<Vec<_>>();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
            "tools": [
                {
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters
                }
            ],
            "tool_choice": {"type": "tool", "name": tool.name}
        });
        if !system.trim().is_empty() {
            body["system"] = json!(system);
        }
        if let Some(temperature) = self.options.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

impl Provider for Claude {
    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    fn register_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    fn call_tool(self, tool_name: &str) -> ProviderFuture {
        let tool_name = tool_name.to_string();
        Box::pin(async move {
            let tool = self
                .find_tool(&tool_name)
                .cloned()
                .ok_or_else(|| anyhow!("tool '{}' not registered", tool_name))?;
            let body = self.request_body(&tool);
            let url = base_url();
            debug!("Claude request to {} (model {})", url, self.model);

            let response = reqwest::Client::new()
                .post(&url)
                .header("x-api-key", self.key.clone())
                .header("anthropic-version", "2023-06-01")
                .json(&body)
                .send()
                .await
                .with_context(|| "failed to reach Anthropic")?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!(
                    "Claude API error ({}): {}",
                    status,
                    extract_claude_error(&text).unwrap_or(text)
                ));
            }
            extract_tool_response(&text, &tool_name, &self.model)
        })
    }
}

fn base_url() -> String {
    std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn extract_tool_response(
    text: &str,
    tool_name: &str,
    fallback_model: &str,
) -> Result<ProviderResponse> {
    let payload: ClaudeResponse =
        serde_json::from_str(text).with_context(|| "failed to parse Claude response JSON")?;
    let block = payload
        .content
        .iter()
        .find(|block| block.kind == "tool_use" && block.name.as_deref() == Some(tool_name))
        .ok_or_else(|| anyhow!("no tool call returned from Claude"))?;
    let args = block
        .input
        .clone()
        .ok_or_else(|| anyhow!("Claude tool_use missing input"))?;

    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage
            .input_tokens
            .zip(usage.output_tokens)
            .map(|(input, output)| input + output),
    });
    Ok(ProviderResponse { args, model, usage })
}

fn extract_claude_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ClaudeError>,
    }

    #[derive(Deserialize)]
    struct ClaudeError {
        #[serde(rename = "type")]
        kind: Option<String>,
        message: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, None))
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    model: Option<String>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    input: Option<serde_json::Value>,
}
