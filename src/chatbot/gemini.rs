//! Gemini API client for text generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Model used when the config doesn't name one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Anything that went wrong between sending the prompt and holding the text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Gemini error: {0}")]
    Api(String),
    #[error("unexpected response shape: {0}")]
    Empty(&'static str),
}

// The request URL carries the API key as a query parameter, so it is stripped
// before the error can reach a log line.
impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Http(e.without_url())
    }
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, GEMINI_API_BASE.to_string())
    }

    fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Endpoint without the key, safe to log.
    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        info!("🧠 Generating with {}: {}", self.model, prompt.chars().take(50).collect::<String>());

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GenerationError::Status { status, body });
        }

        let text = parse_response(&body)?;
        info!("🧠 Generated {} chars", text.chars().count());
        Ok(text)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
fn parse_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body)?;

    if let Some(error) = parsed.error {
        return Err(GenerationError::Api(error.message));
    }

    let candidates = parsed.candidates.ok_or(GenerationError::Empty("no candidates"))?;
    let candidate = candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::Empty("empty candidates array"))?;
    let content = candidate
        .content
        .ok_or(GenerationError::Empty("no content in candidate"))?;
    let part = content
        .parts
        .and_then(|parts| parts.into_iter().next())
        .ok_or(GenerationError::Empty("no parts in content"))?;
    let text = part.text.ok_or(GenerationError::Empty("no text in part"))?;

    // Discord rejects empty messages
    if text.trim().is_empty() {
        return Err(GenerationError::Empty("blank text"));
    }

    Ok(text)
}
