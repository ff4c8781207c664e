use serde::Serialize;
use serde_json::{Map, Value};

/// Price per token in USD for the fixed inference model.
pub const TOKEN_PRICE_USD: f64 = 0.50 / 1_000_000.0;

/// One conversation turn sent to the inference backend.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Builds a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Builds a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Builds an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Estimated cost in USD for a token count.
pub fn token_price(tokens: u32) -> f64 {
    f64::from(tokens) * TOKEN_PRICE_USD
}

/// One-line footer reporting token consumption and estimated cost.
pub fn usage_line(tokens: u32) -> String {
    format!(
        "_[tokens used: {tokens} | Estimated cost US${:.5}]_",
        token_price(tokens)
    )
}

/// Completion returned by a plain chat call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Completion text.
    pub message: String,
    /// Total tokens the call consumed.
    pub tokens: u32,
    /// Estimated cost in USD.
    pub cost: f64,
    /// Pre-formatted usage footer.
    pub usage: String,
}

impl ChatResponse {
    /// Builds a response, deriving cost and footer from the token count.
    pub fn new(message: String, tokens: u32) -> Self {
        Self {
            message,
            tokens,
            cost: token_price(tokens),
            usage: usage_line(tokens),
        }
    }
}

/// Parsed arguments returned by a forced tool call.
#[derive(Debug, Clone)]
pub struct FunctionResponse {
    /// Argument name to value mapping from the tool invocation.
    pub parameters: Map<String, Value>,
    /// Total tokens the call consumed.
    pub tokens: u32,
    /// Estimated cost in USD.
    pub cost: f64,
    /// Pre-formatted usage footer.
    pub usage: String,
}

impl FunctionResponse {
    /// Builds a response, deriving cost and footer from the token count.
    pub fn new(parameters: Map<String, Value>, tokens: u32) -> Self {
        Self {
            parameters,
            tokens,
            cost: token_price(tokens),
            usage: usage_line(tokens),
        }
    }
}
