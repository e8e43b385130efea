/// Identity verification against the hosted auth service
///
/// Gengate does not issue or validate tokens itself. Callers present an
/// opaque bearer credential minted by the hosted auth service, and the
/// gateway exchanges it for a user identifier with one outbound request
/// per invocation. Any failure in that exchange (transport error, rejected
/// token, unparseable response) means the caller is unauthenticated.
///
/// The exchange uses the restricted credential tier: the `apikey` header
/// identifies this service to the auth endpoint but grants no write access
/// anywhere.
///
/// # Example
///
/// ```no_run
/// use gengate_shared::auth::{AuthApiClient, IdentityVerifier};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = AuthApiClient::new("https://auth.example.com/auth/v1", "restricted-key")?;
/// let user = verifier.verify("caller-bearer-token").await?;
/// println!("Authenticated as {}", user.id);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Identity verification error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The auth service rejected the credential
    #[error("Authentication error: {0}")]
    Rejected(String),

    /// The auth service accepted the request but returned no usable user
    #[error("User not authenticated")]
    NotAuthenticated,

    /// The auth service could not be reached
    #[error("Auth service request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Verified caller identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// User ID assigned by the hosted auth service
    pub id: Uuid,
}

/// Identity verification contract
///
/// The gateway resolves bearer tokens through this trait so tests can
/// substitute a canned identity and count verification calls.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Exchanges a bearer token for the user it belongs to
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] when the auth service turns the
    /// token down, [`AuthError::NotAuthenticated`] when it answers
    /// without a usable user, and [`AuthError::Request`] when the
    /// service cannot be reached.
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Error payload returned by the hosted auth service
///
/// The service uses `msg` on current versions and `error_description` on
/// older ones; either may be absent.
#[derive(Debug, Deserialize)]
struct AuthServiceError {
    msg: Option<String>,
    error_description: Option<String>,
}

impl AuthServiceError {
    fn message(self) -> Option<String> {
        self.msg.or(self.error_description)
    }
}

/// HTTP client for the hosted auth service
///
/// Performs `GET {base_url}/user` with the caller's bearer token and the
/// restricted service key, and parses the user identifier out of the
/// response.
#[derive(Clone)]
pub struct AuthApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthApiClient {
    /// Creates a new client for the auth endpoint at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(AuthApiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for AuthApiClient {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let url = format!("{}/user", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<AuthServiceError>()
                .await
                .ok()
                .and_then(AuthServiceError::message)
                .unwrap_or_else(|| format!("auth service returned {}", status));

            return Err(AuthError::Rejected(message));
        }

        response
            .json::<AuthUser>()
            .await
            .map_err(|_| AuthError::NotAuthenticated)
    }
}
