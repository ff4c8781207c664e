//! Weather reporting integration.
//!
//! Resolves place names against the provider's site directory, fetches daily
//! forecasts, and optionally leans on the chat backend to pull place names
//! out of free text and rephrase the combined forecast.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::chat::client::ChatError;

/// Weather-code vocabulary.
pub mod codes;
/// Site directory and daily forecast client.
pub mod datapoint;
/// Chat-assisted forecast flows.
pub mod report;

/// Anything that can turn a place name into a forecast line.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Forecast sentence, or a user-facing message, for one place name.
    async fn forecast(&self, location_name: &str) -> Result<String, WeatherError>;
}

#[derive(Debug)]
pub enum WeatherError {
    MissingEnv { key_env: &'static str },
    Request { source: reqwest::Error },
    Api { status: StatusCode, body: String },
    MalformedResponse { detail: &'static str },
    Chat(ChatError),
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnv { key_env } => {
                write!(f, "{key_env} is not set in the environment")
            }
            Self::Request { source } => write!(f, "weather request failed: {source}"),
            Self::Api { status, body } => write!(f, "weather API error {status}: {body}"),
            Self::MalformedResponse { detail } => {
                write!(f, "weather response was malformed: {detail}")
            }
            Self::Chat(source) => write!(f, "chat backend failed: {source}"),
        }
    }
}

impl std::error::Error for WeatherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            Self::Chat(source) => Some(source),
            _ => None,
        }
    }
}
