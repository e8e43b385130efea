/// Google Gemini client
///
/// Thin wrapper around the `generateContent` REST endpoint. The gateway
/// sends one request per generation with a fixed decoding configuration
/// and moderate safety thresholds; the response is reduced to the text of
/// the first candidate.
///
/// # Example
///
/// ```no_run
/// use gengate_shared::provider::gemini::GeminiClient;
/// use gengate_shared::provider::TextGenerator;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GeminiClient::new(
///     "https://generativelanguage.googleapis.com/v1beta",
///     "api-key",
///     "gemini-1.5-flash-latest",
/// )?;
/// let text = client.generate("You are a helpful assistant.", "Say hi").await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{read_capped_error_body, ProviderError, TextGenerator};

/// Default Gemini REST endpoint base
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Connection timeout for the upstream client
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a client for the given endpoint, key, and model
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

/// Builds the `generateContent` request payload
///
/// The system instruction and user prompt are folded into a single user
/// turn. Decoding is near-deterministic (`topK` 1) at moderate
/// temperature, capped at 2048 output tokens, with all four harm
/// categories blocked at medium and above.
fn build_request_body(system_instruction: &str, prompt: &str) -> Value {
    json!({
        "contents": [{
            "parts": [{
                "text": format!("{system_instruction}\n\nUser request: {prompt}")
            }]
        }],
        "generationConfig": {
            "temperature": 0.7,
            "topK": 1,
            "topP": 1,
            "maxOutputTokens": 2048,
        },
        "safetySettings": [
            {
                "category": "HARM_CATEGORY_HARASSMENT",
                "threshold": "BLOCK_MEDIUM_AND_ABOVE"
            },
            {
                "category": "HARM_CATEGORY_HATE_SPEECH",
                "threshold": "BLOCK_MEDIUM_AND_ABOVE"
            },
            {
                "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT",
                "threshold": "BLOCK_MEDIUM_AND_ABOVE"
            },
            {
                "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
                "threshold": "BLOCK_MEDIUM_AND_ABOVE"
            }
        ]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if present
    fn into_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .next()?
            .text
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_request_body(system_instruction, prompt);

        tracing::debug!(model = %self.model, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                503 => ProviderError::Overloaded,
                429 => ProviderError::RateLimited,
                code => ProviderError::Upstream {
                    status: code,
                    body: read_capped_error_body(response).await,
                },
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|_| ProviderError::NoContent)?;

        parsed.into_text().ok_or(ProviderError::NoContent)
    }
}
