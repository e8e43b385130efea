/// Generative-text provider client
///
/// This module defines the contract the gateway uses to obtain generated
/// text, plus the production Gemini implementation.
///
/// # Modules
///
/// - [`gemini`]: Google Gemini `generateContent` client
///
/// # Error Handling
///
/// Upstream HTTP statuses map onto [`ProviderError`] variants the gateway
/// surfaces directly: 503 becomes [`ProviderError::Overloaded`], 429
/// becomes [`ProviderError::RateLimited`], and every other non-success
/// status becomes [`ProviderError::Upstream`] carrying the raw status and
/// (capped) body for diagnostics. Nothing is retried here; retry is the
/// caller's decision.

pub mod gemini;

use async_trait::async_trait;

/// Upper bound on upstream error bodies carried into error messages
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Provider error
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Upstream returned 503
    #[error("The AI service is temporarily overloaded. Please try again in a few moments.")]
    Overloaded,

    /// Upstream returned 429
    #[error("Rate limit exceeded. Please wait a moment before trying again.")]
    RateLimited,

    /// Upstream returned some other non-success status
    #[error("Gemini API error: {status} {body}")]
    Upstream {
        /// Raw HTTP status code
        status: u16,
        /// Response body, truncated to a sane length
        body: String,
    },

    /// Upstream answered 200 but the response lacks generated content
    #[error("No content generated from Gemini API")]
    NoContent,

    /// The provider could not be reached
    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Text generation contract
///
/// One call per gateway invocation: a fixed system instruction plus the
/// caller's prompt in, generated text out. Tests substitute a scripted
/// generator to control outcomes and count upstream calls.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt` under `system_instruction`
    ///
    /// # Errors
    ///
    /// See [`ProviderError`] for the status-to-variant mapping.
    async fn generate(&self, system_instruction: &str, prompt: &str)
        -> Result<String, ProviderError>;
}

/// Reads an error response body, truncating oversized payloads
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(_) => return String::new(),
    };

    if bytes.len() > MAX_ERROR_BODY_BYTES {
        let text = String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY_BYTES]);
        format!("{text}...(truncated)")
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
