/// Text generation endpoint
///
/// This is the core endpoint of the gateway: it checks the caller's
/// credit balance, forwards the prompt to the Gemini model under a
/// mode-specific system instruction, deducts the flat generation cost,
/// and returns the generated text together with the credit accounting.
///
/// # Endpoint
///
/// `POST /v1/generate`
///
/// # Authentication
///
/// Requires a bearer token minted by the hosted auth service
/// (`Authorization: Bearer <token>`).
///
/// # Example Request
///
/// ```json
/// {
///   "prompt": "Write a binary search in Rust",
///   "mode": "code"
/// }
/// ```
///
/// # Example Response
///
/// ```json
/// {
///   "generatedText": "Here is a binary search implementation...",
///   "creditsUsed": 10,
///   "creditsRemaining": 190
/// }
/// ```

use crate::app::AppState;
use crate::error::ApiError;
use axum::{extract::State, Extension, Json};
use gengate_shared::auth::AuthUser;
use gengate_shared::codeblocks::extract_code_blocks;
use gengate_shared::credits::GENERATION_COST;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generation mode, selecting the system instruction sent to the model
///
/// Unknown or missing modes fall back to [`Mode::Chat`] rather than
/// failing the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Mode {
    /// Code generation
    Code,

    /// Debugging assistance
    Debug,

    /// Code improvement
    Enhance,

    /// General conversation
    #[default]
    Chat,
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "code" => Mode::Code,
            "debug" => Mode::Debug,
            "enhance" => Mode::Enhance,
            _ => Mode::Chat,
        }
    }
}

impl Mode {
    /// The system instruction sent to the model for this mode
    pub fn system_instruction(self) -> &'static str {
        match self {
            Mode::Code => {
                "You are an expert code generator. Generate clean, efficient, and \
                 well-documented code based on the user's requirements. Include \
                 explanations and best practices."
            }
            Mode::Debug => {
                "You are a debugging expert. Analyze the code, identify issues, and \
                 provide solutions with explanations."
            }
            Mode::Enhance => {
                "You are a code enhancement specialist. Improve the provided code for \
                 better performance, readability, and maintainability."
            }
            Mode::Chat => {
                "You are a helpful AI assistant that provides accurate and helpful \
                 responses."
            }
        }
    }
}

/// Generation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateRequest {
    /// The user's prompt; must be non-empty
    #[serde(default)]
    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,

    /// Generation mode (code, debug, enhance, chat)
    #[serde(default)]
    pub mode: Mode,
}

/// Generation response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// The model's generated text
    pub generated_text: String,

    /// Credits charged for this generation
    pub credits_used: i32,

    /// Credits left, computed from the balance read before generation
    pub credits_remaining: i32,
}

/// Extracts the first human-readable message from validation errors
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|field_errors| field_errors.iter())
        .filter_map(|error| error.message.as_ref())
        .map(ToString::to_string)
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}

/// Generation endpoint handler
///
/// # Flow
///
/// 1. Read the caller's credit balance
/// 2. Decline with 400 if the balance cannot cover one generation
/// 3. Validate the prompt
/// 4. Invoke the model with the mode's system instruction
/// 5. Deduct the generation cost (a failed deduction is logged, not fatal)
/// 6. Return the text plus credit accounting
///
/// The balance check and the deduction are intentionally not atomic:
/// concurrent requests may both pass the check and drive the stored
/// balance negative. Credits are advisory, not an accounting ledger.
///
/// # Errors
///
/// - 400 Bad Request: insufficient credits
/// - 503 Service Unavailable: model endpoint overloaded
/// - 429 Too Many Requests: model endpoint rate limit
/// - 500 Internal Server Error: everything else
pub async fn generate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let balance = state.credits.fetch(user.id).await?;

    if !balance.can_afford(GENERATION_COST) {
        return Err(ApiError::InsufficientCredits {
            available: balance.credits,
        });
    }

    // Validation runs after the gate: an unfunded caller is told about
    // credits even when the prompt is empty.
    request
        .validate()
        .map_err(|errors| ApiError::InvalidRequest(first_validation_message(&errors)))?;

    tracing::info!(
        user_id = %user.id,
        mode = ?request.mode,
        credits = balance.credits,
        "Starting generation"
    );

    let instruction = request.mode.system_instruction();
    let generated_text = state.model.generate(instruction, &request.prompt).await?;

    // The model call already happened, so a failed deduction must not
    // fail the request. The caller keeps the text either way.
    match state.credits.deduct(user.id, GENERATION_COST).await {
        Ok(remaining) => {
            tracing::debug!(user_id = %user.id, remaining, "Credits deducted");
        }
        Err(err) => {
            tracing::error!(
                user_id = %user.id,
                error = %err,
                "Failed to deduct credits after generation"
            );
        }
    }

    let extracted = extract_code_blocks(&generated_text);
    tracing::info!(
        user_id = %user.id,
        chars = generated_text.len(),
        code_blocks = extracted.blocks.len(),
        "Generation completed"
    );

    Ok(Json(GenerateResponse {
        generated_text,
        credits_used: GENERATION_COST,
        credits_remaining: balance.credits - GENERATION_COST,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::from("code".to_string()), Mode::Code);
        assert_eq!(Mode::from("debug".to_string()), Mode::Debug);
        assert_eq!(Mode::from("enhance".to_string()), Mode::Enhance);
        assert_eq!(Mode::from("chat".to_string()), Mode::Chat);
    }

    #[test]
    fn test_unknown_mode_falls_back_to_chat() {
        assert_eq!(Mode::from("poetry".to_string()), Mode::Chat);
        assert_eq!(Mode::from("".to_string()), Mode::Chat);
        // Mode matching is case-sensitive
        assert_eq!(Mode::from("Code".to_string()), Mode::Chat);
    }

    #[test]
    fn test_missing_mode_defaults_to_chat() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "prompt": "hello"
        }))
        .unwrap();

        assert_eq!(request.mode, Mode::Chat);
    }

    #[test]
    fn test_system_instructions() {
        assert!(Mode::Code
            .system_instruction()
            .starts_with("You are an expert code generator."));
        assert!(Mode::Debug
            .system_instruction()
            .starts_with("You are a debugging expert."));
        assert!(Mode::Enhance
            .system_instruction()
            .starts_with("You are a code enhancement specialist."));
        assert_eq!(
            Mode::Chat.system_instruction(),
            "You are a helpful AI assistant that provides accurate and helpful responses."
        );
    }

    #[test]
    fn test_empty_prompt_fails_validation() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "prompt": "",
            "mode": "code"
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        assert_eq!(first_validation_message(&errors), "Prompt is required");
    }

    #[test]
    fn test_missing_prompt_fails_validation() {
        let request: GenerateRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_whitespace_prompt_passes_validation() {
        // Only the empty string is rejected; whitespace counts as content
        let request: GenerateRequest = serde_json::from_value(json!({
            "prompt": " "
        }))
        .unwrap();

        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_response_uses_camel_case() {
        let response = GenerateResponse {
            generated_text: "hello".to_string(),
            credits_used: 10,
            credits_remaining: 190,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["generatedText"], "hello");
        assert_eq!(value["creditsUsed"], 10);
        assert_eq!(value["creditsRemaining"], 190);
    }
}
