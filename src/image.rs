use std::env;
use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

const API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";
const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Model-id prefix of the family that supports prompt upsampling.
const UPSAMPLING_PREFIX: &str = "black-forest-labs/";

/// Credentials and endpoint for the image-generation service.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub api_token: String,
    pub base_url: String,
}

impl ImageConfig {
    /// Reads the token from `REPLICATE_API_TOKEN`, using the public endpoint.
    pub fn from_env() -> Result<Self, ImageError> {
        let api_token = env::var(API_TOKEN_ENV).map_err(|_| ImageError::MissingEnv {
            key_env: API_TOKEN_ENV,
        })?;
        Ok(Self {
            api_token,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

#[derive(Debug)]
pub enum ImageError {
    MissingEnv { key_env: &'static str },
    Request { source: reqwest::Error },
    Api { status: StatusCode, body: String },
    MissingOutput,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnv { key_env } => {
                write!(f, "{key_env} is not set in the environment")
            }
            Self::Request { source } => write!(f, "generation request failed: {source}"),
            Self::Api { status, body } => {
                write!(f, "generation API error {status}: {body}")
            }
            Self::MissingOutput => {
                write!(f, "generation response did not contain an output reference")
            }
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            _ => None,
        }
    }
}

/// Remote pipeline family, resolved once from the model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Accepts aspect ratio, output settings, and prompt upsampling.
    Upsampling,
    /// Generic pipeline driven at a fixed 1024x1024 resolution.
    FixedResolution,
}

impl ModelFamily {
    pub fn of(model: &str) -> Self {
        if model.starts_with(UPSAMPLING_PREFIX) {
            Self::Upsampling
        } else {
            Self::FixedResolution
        }
    }
}

/// Parameters for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub output_format: String,
    pub output_quality: u8,
    pub enhance_prompt: bool,
}

impl GenerationRequest {
    /// Request with the default model and output settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: "black-forest-labs/flux-schnell".to_string(),
            aspect_ratio: "1:1".to_string(),
            output_format: "webp".to_string(),
            output_quality: 90,
            enhance_prompt: true,
        }
    }
}

/// Image-generation client.
#[derive(Debug, Clone)]
pub struct ImageClient {
    api_token: String,
    base_url: String,
    http: reqwest::Client,
}

impl ImageClient {
    pub fn new(config: ImageConfig) -> Self {
        Self {
            api_token: config.api_token,
            base_url: config.base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Submits one generation call and returns the first produced reference.
    ///
    /// The call blocks server-side until the prediction finishes; failures
    /// propagate unchanged, with no retry and no fallback image.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, ImageError> {
        let url = format!(
            "{}/v1/models/{}/predictions",
            self.base_url.trim_end_matches('/'),
            request.model,
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&json!({ "input": build_input(request) }))
            .send()
            .await
            .map_err(|source| ImageError::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Api { status, body });
        }

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|source| ImageError::Request { source })?;
        first_output(prediction)
    }
}

fn build_input(request: &GenerationRequest) -> Value {
    match ModelFamily::of(&request.model) {
        // The safety checker stays off for this family; output settings are
        // caller-controlled.
        ModelFamily::Upsampling => json!({
            "prompt": request.prompt,
            "num_outputs": 1,
            "aspect_ratio": request.aspect_ratio,
            "output_format": request.output_format,
            "output_quality": request.output_quality,
            "prompt_upsampling": request.enhance_prompt,
            "disable_safety_checker": true,
        }),
        ModelFamily::FixedResolution => json!({
            "width": 1024,
            "height": 1024,
            "prompt": request.prompt,
            "guidance_scale": 5,
            "negative_prompt": "",
            "pag_guidance_scale": 2,
            "num_inference_steps": 18,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    output: Option<PredictionOutput>,
}

/// The service returns either one reference or an ordered list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionOutput {
    Single(String),
    Many(Vec<String>),
}

fn first_output(prediction: Prediction) -> Result<String, ImageError> {
    match prediction.output.ok_or(ImageError::MissingOutput)? {
        PredictionOutput::Single(reference) => Ok(reference),
        PredictionOutput::Many(references) => references
            .into_iter()
            .next()
            .ok_or(ImageError::MissingOutput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_resolves_from_model_prefix() {
        assert_eq!(
            ModelFamily::of("black-forest-labs/flux-schnell"),
            ModelFamily::Upsampling
        );
        assert_eq!(
            ModelFamily::of("stability-ai/sdxl"),
            ModelFamily::FixedResolution
        );
    }

    #[test]
    fn upsampling_family_input_shape() {
        let request = GenerationRequest::new("a red fox");
        let input = build_input(&request);

        assert_eq!(input["prompt"], "a red fox");
        assert_eq!(input["prompt_upsampling"], true);
        assert_eq!(input["disable_safety_checker"], true);
        assert_eq!(input["aspect_ratio"], "1:1");
        assert_eq!(input["output_quality"], 90);
        assert!(input.get("width").is_none());
        assert!(input.get("height").is_none());
        assert!(input.get("guidance_scale").is_none());
    }

    #[test]
    fn fixed_resolution_family_input_shape() {
        let mut request = GenerationRequest::new("a red fox");
        request.model = "stability-ai/sdxl".to_string();
        let input = build_input(&request);

        assert_eq!(input["width"], 1024);
        assert_eq!(input["height"], 1024);
        assert_eq!(input["guidance_scale"], 5);
        assert_eq!(input["num_inference_steps"], 18);
        assert!(input.get("prompt_upsampling").is_none());
        assert!(input.get("aspect_ratio").is_none());
        assert!(input.get("output_format").is_none());
    }

    #[test]
    fn list_output_yields_first_element() {
        let prediction: Prediction = serde_json::from_str(
            r#"{"output":["https://img/one.webp","https://img/two.webp"]}"#,
        )
        .expect("prediction should deserialize");
        assert_eq!(
            first_output(prediction).expect("output present"),
            "https://img/one.webp"
        );
    }

    #[test]
    fn scalar_output_is_returned_unchanged() {
        let prediction: Prediction =
            serde_json::from_str(r#"{"output":"https://img/only.webp"}"#)
                .expect("prediction should deserialize");
        assert_eq!(
            first_output(prediction).expect("output present"),
            "https://img/only.webp"
        );
    }

    #[test]
    fn empty_or_absent_output_is_an_error() {
        let empty: Prediction =
            serde_json::from_str(r#"{"output":[]}"#).expect("prediction should deserialize");
        assert!(matches!(first_output(empty), Err(ImageError::MissingOutput)));

        let absent: Prediction =
            serde_json::from_str(r#"{}"#).expect("prediction should deserialize");
        assert!(matches!(
            first_output(absent),
            Err(ImageError::MissingOutput)
        ));
    }
}
