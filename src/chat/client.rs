use std::env;
use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::chat::message::{ChatMessage, ChatResponse, FunctionResponse};
use crate::chat::tools::ToolDefinition;

/// Model identifier sent with every request.
const CHAT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.1";

const API_KEY_ENV: &str = "ANYSCALE_API_KEY";
const BASE_URL_ENV: &str = "ANYSCALE_BASE_URL";

/// Credentials and endpoint for the inference backend.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    /// API root, including the version segment.
    pub base_url: String,
}

impl ChatConfig {
    /// Reads the config from `ANYSCALE_API_KEY` and `ANYSCALE_BASE_URL`.
    pub fn from_env() -> Result<Self, ChatError> {
        let api_key = env::var(API_KEY_ENV).map_err(|_| ChatError::MissingEnv {
            key_env: API_KEY_ENV,
        })?;
        let base_url = env::var(BASE_URL_ENV).map_err(|_| ChatError::MissingEnv {
            key_env: BASE_URL_ENV,
        })?;
        Ok(Self { api_key, base_url })
    }
}

#[derive(Debug)]
pub enum ChatError {
    MissingEnv { key_env: &'static str },
    Request { source: reqwest::Error },
    Api { status: StatusCode, body: String },
    EmptyResponse,
    NoToolDeclared,
    MissingToolCall,
    BadToolArguments { source: serde_json::Error },
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnv { key_env } => {
                write!(f, "{key_env} is not set in the environment")
            }
            Self::Request { source } => write!(f, "chat request failed: {source}"),
            Self::Api { status, body } => write!(f, "chat API error {status}: {body}"),
            Self::EmptyResponse => {
                write!(f, "chat response did not contain message content")
            }
            Self::NoToolDeclared => {
                write!(f, "a forced function call needs at least one declared tool")
            }
            Self::MissingToolCall => {
                write!(f, "chat response did not contain a tool call")
            }
            Self::BadToolArguments { source } => {
                write!(f, "tool call arguments were not a JSON object: {source}")
            }
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            Self::BadToolArguments { source } => Some(source),
            _ => None,
        }
    }
}

/// Inference backend surface consumed by the chat-assisted flows.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Plain conversational completion.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatResponse, ChatError>;

    /// Forced invocation of the first declared tool.
    async fn function_call(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> Result<FunctionResponse, ChatError>;
}

/// Chat-completions client bound to a fixed model.
#[derive(Debug, Clone)]
pub struct ChatClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            api_key: config.api_key,
            base_url: config.base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Sends the conversation and returns the completion with usage.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatResponse, ChatError> {
        let payload = ChatCompletionRequest {
            model: CHAT_MODEL.to_string(),
            messages: messages.to_vec(),
            temperature,
            tools: None,
            tool_choice: None,
        };
        let body = self.send(&payload).await?;
        let (message, tokens) = completion_text(body)?;
        Ok(ChatResponse::new(message, tokens))
    }

    /// Sends the conversation with tool declarations, forcing the first tool.
    ///
    /// Only single-tool forcing is supported: additional declarations are
    /// passed through but never selected.
    pub async fn function_call(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> Result<FunctionResponse, ChatError> {
        let forced = tools.first().ok_or(ChatError::NoToolDeclared)?;
        let payload = ChatCompletionRequest {
            model: CHAT_MODEL.to_string(),
            messages: messages.to_vec(),
            temperature,
            tools: Some(tools.iter().map(ToolDefinition::to_json).collect()),
            tool_choice: Some(json!({
                "type": "function",
                "function": { "name": forced.name() },
            })),
        };
        let body = self.send(&payload).await?;
        let (parameters, tokens) = forced_call_arguments(body)?;
        Ok(FunctionResponse::new(parameters, tokens))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send(
        &self,
        payload: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ChatError> {
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|source| ChatError::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|source| ChatError::Request { source })
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatResponse, ChatError> {
        ChatClient::chat(self, messages, temperature).await
    }

    async fn function_call(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> Result<FunctionResponse, ChatError> {
        ChatClient::function_call(self, messages, tools, temperature).await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: UsagePayload,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallPayload>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    function: FunctionPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionPayload {
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    total_tokens: u32,
}

fn completion_text(body: ChatCompletionResponse) -> Result<(String, u32), ChatError> {
    let tokens = body.usage.total_tokens;
    let message = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(ChatError::EmptyResponse)?;
    Ok((message, tokens))
}

fn forced_call_arguments(
    body: ChatCompletionResponse,
) -> Result<(Map<String, Value>, u32), ChatError> {
    let tokens = body.usage.total_tokens;
    let call = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls)
        .and_then(|calls| calls.into_iter().next())
        .ok_or(ChatError::MissingToolCall)?;
    let parameters = serde_json::from_str(&call.function.arguments)
        .map_err(|source| ChatError::BadToolArguments { source })?;
    Ok((parameters, tokens))
}
