/// Credit balance endpoint
///
/// Lets authenticated callers read their current credit balance, e.g.
/// for display next to the generation UI.
///
/// # Endpoint
///
/// `GET /v1/credits`
///
/// # Response
///
/// ```json
/// { "credits": 190 }
/// ```
///
/// A caller without a balance row reads as zero credits rather than an
/// error; the row is only created once credits are granted.

use crate::app::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Extension, Json};
use gengate_shared::auth::AuthUser;
use gengate_shared::credits::CreditError;
use serde::{Deserialize, Serialize};

/// Credit balance response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreditsResponse {
    /// Credits currently available to the caller
    pub credits: i32,
}

/// Credit balance handler
pub async fn get_credits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<CreditsResponse>> {
    let credits = match state.credits.fetch(user.id).await {
        Ok(balance) => balance.credits,
        Err(CreditError::NotFound(_)) => 0,
        Err(err) => return Err(err.into()),
    };

    Ok(Json(CreditsResponse { credits }))
}
