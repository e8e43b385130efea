/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts
/// to the appropriate HTTP status code.
///
/// # Status Mapping
///
/// Clients distinguish only a handful of outcomes, so the mapping is
/// deliberately narrow: insufficient credits is 400, an overloaded
/// upstream is 503, an upstream rate limit is 429, and every other
/// failure (authentication included) is 500.
///
/// # Response Format
///
/// Every error renders as a single-field JSON body:
///
/// ```json
/// { "error": "Insufficient credits. You need at least 10 credits." }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gengate_shared::auth::AuthError;
use gengate_shared::credits::CreditError;
use gengate_shared::provider::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// The caller's identity could not be established (500)
    Unauthenticated(String),

    /// The request body failed validation (500)
    InvalidRequest(String),

    /// The credit balance could not be read (500)
    BalanceLookupFailed(CreditError),

    /// The caller cannot afford a generation (400)
    InsufficientCredits {
        /// Credits the caller actually has
        available: i32,
    },

    /// The model endpoint reported overload (503)
    ServiceOverloaded,

    /// The model endpoint rate limited us (429)
    RateLimited,

    /// The model endpoint failed with some other status (500)
    UpstreamFailure {
        /// Raw upstream status code
        status: u16,
        /// Upstream response body
        body: String,
    },

    /// The model endpoint answered without generated content (500)
    MalformedUpstreamResponse,

    /// Anything else (500)
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthenticated(msg) => write!(f, "{}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "{}", msg),
            ApiError::BalanceLookupFailed(_) => write!(f, "Failed to check user credits"),
            ApiError::InsufficientCredits { .. } => {
                write!(f, "Insufficient credits. You need at least 10 credits.")
            }
            ApiError::ServiceOverloaded => write!(
                f,
                "The AI service is temporarily overloaded. Please try again in a few moments."
            ),
            ApiError::RateLimited => write!(
                f,
                "Rate limit exceeded. Please wait a moment before trying again."
            ),
            ApiError::UpstreamFailure { status, body } => {
                write!(f, "Gemini API error: {} {}", status, body)
            }
            ApiError::MalformedUpstreamResponse => {
                write!(f, "No content generated from Gemini API")
            }
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Every failure class is logged here, before translation into
        // the wire shape.
        let status = match &self {
            ApiError::Unauthenticated(msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidRequest(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BalanceLookupFailed(source) => {
                tracing::error!(error = %source, "Credit balance lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InsufficientCredits { available } => {
                tracing::info!(available, "Generation declined: insufficient credits");
                StatusCode::BAD_REQUEST
            }
            ApiError::ServiceOverloaded => {
                tracing::warn!("Generation failed: model endpoint overloaded");
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::RateLimited => {
                tracing::warn!("Generation failed: model endpoint rate limit");
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::UpstreamFailure { status, body } => {
                tracing::error!(status, body = %body, "Upstream generation request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::MalformedUpstreamResponse => {
                tracing::error!("Upstream response carried no generated content");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Convert identity verification errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(_) | AuthError::NotAuthenticated => {
                ApiError::Unauthenticated(err.to_string())
            }
            AuthError::Request(transport) => {
                ApiError::Unauthenticated(format!("Authentication error: {}", transport))
            }
        }
    }
}

/// Convert credit store errors to API errors
impl From<CreditError> for ApiError {
    fn from(err: CreditError) -> Self {
        ApiError::BalanceLookupFailed(err)
    }
}

/// Convert provider errors to API errors
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Overloaded => ApiError::ServiceOverloaded,
            ProviderError::RateLimited => ApiError::RateLimited,
            ProviderError::Upstream { status, body } => {
                ApiError::UpstreamFailure { status, body }
            }
            ProviderError::NoContent => ApiError::MalformedUpstreamResponse,
            ProviderError::Request(transport) => ApiError::Internal(transport.to_string()),
        }
    }
}
