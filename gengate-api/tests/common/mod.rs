/// Common test utilities for integration tests
///
/// The full router runs against in-process fakes for the three
/// collaborators (identity verifier, credit store, model client), so
/// tests exercise routing, middleware, and handler logic without a
/// database, an auth service, or a model endpoint. The fakes count
/// calls so tests can also assert what a request did NOT touch.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use chrono::Utc;
use gengate_api::app::{build_router, AppState};
use gengate_api::config::{ApiConfig, AuthConfig, Config, DatabaseConfig, GeminiConfig};
use gengate_shared::auth::{AuthError, AuthUser, IdentityVerifier};
use gengate_shared::credits::{CreditBalance, CreditError, CreditStore};
use gengate_shared::provider::{ProviderError, TextGenerator};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;
use uuid::Uuid;

/// Scripted identity verifier
pub struct MockVerifier {
    user_id: Uuid,
    accept: AtomicBool,
    calls: AtomicUsize,
}

impl MockVerifier {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            accept: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Makes subsequent verifications fail
    pub fn reject(&self) {
        self.accept.store(false, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for MockVerifier {
    async fn verify(&self, _token: &str) -> Result<AuthUser, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept.load(Ordering::SeqCst) {
            Ok(AuthUser { id: self.user_id })
        } else {
            Err(AuthError::Rejected("invalid JWT".to_string()))
        }
    }
}

/// In-memory credit store
///
/// A balance of `None` models a user without a balance row.
pub struct MockCreditStore {
    balance: Mutex<Option<i32>>,
    fail_deduct: AtomicBool,
    healthy: AtomicBool,
    fetch_calls: AtomicUsize,
    deduct_calls: AtomicUsize,
}

impl MockCreditStore {
    pub fn new(balance: Option<i32>) -> Self {
        Self {
            balance: Mutex::new(balance),
            fail_deduct: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            fetch_calls: AtomicUsize::new(0),
            deduct_calls: AtomicUsize::new(0),
        }
    }

    pub fn balance(&self) -> Option<i32> {
        *self.balance.lock().unwrap()
    }

    /// Makes deductions fail while balance reads keep working
    pub fn fail_deductions(&self) {
        self.fail_deduct.store(true, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn deduct_count(&self) -> usize {
        self.deduct_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreditStore for MockCreditStore {
    async fn fetch(&self, user_id: Uuid) -> Result<CreditBalance, CreditError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match *self.balance.lock().unwrap() {
            Some(credits) => Ok(CreditBalance {
                user_id,
                credits,
                updated_at: Utc::now(),
            }),
            None => Err(CreditError::NotFound(user_id)),
        }
    }

    async fn deduct(&self, user_id: Uuid, amount: i32) -> Result<i32, CreditError> {
        self.deduct_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deduct.load(Ordering::SeqCst) {
            return Err(CreditError::Database(sqlx::Error::PoolClosed));
        }
        let mut balance = self.balance.lock().unwrap();
        match balance.as_mut() {
            Some(credits) => {
                *credits -= amount;
                Ok(*credits)
            }
            None => Err(CreditError::NotFound(user_id)),
        }
    }

    async fn healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// Scripted model outcome
pub enum ModelBehavior {
    /// Answer with the given text
    Reply(String),
    /// Upstream 503
    Overloaded,
    /// Upstream 429
    RateLimited,
    /// Any other upstream failure
    Fail { status: u16, body: String },
    /// Success without usable content
    Empty,
}

/// Scripted model client
pub struct MockModel {
    behavior: Mutex<ModelBehavior>,
    calls: AtomicUsize,
    last_instruction: Mutex<Option<String>>,
    last_prompt: Mutex<Option<String>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
}

impl MockModel {
    pub fn new(behavior: ModelBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            last_instruction: Mutex::new(None),
            last_prompt: Mutex::new(None),
            barrier: Mutex::new(None),
        }
    }

    pub fn set_behavior(&self, behavior: ModelBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Parks every generation at a shared barrier until `parties`
    /// requests have reached the model
    pub fn hold_at_barrier(&self, parties: usize) {
        *self.barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_instruction(&self) -> Option<String> {
        self.last_instruction.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockModel {
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_instruction.lock().unwrap() = Some(system_instruction.to_string());
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        let barrier = self.barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        let behavior = self.behavior.lock().unwrap();
        match &*behavior {
            ModelBehavior::Reply(text) => Ok(text.clone()),
            ModelBehavior::Overloaded => Err(ProviderError::Overloaded),
            ModelBehavior::RateLimited => Err(ProviderError::RateLimited),
            ModelBehavior::Fail { status, body } => Err(ProviderError::Upstream {
                status: *status,
                body: body.clone(),
            }),
            ModelBehavior::Empty => Err(ProviderError::NoContent),
        }
    }
}

/// Test context wiring the router to scripted collaborators
pub struct TestContext {
    pub app: Router,
    pub verifier: Arc<MockVerifier>,
    pub credits: Arc<MockCreditStore>,
    pub model: Arc<MockModel>,
}

impl TestContext {
    /// Creates a context with a 200-credit balance and a canned reply
    pub fn new() -> Self {
        Self::with_balance(Some(200))
    }

    /// Creates a context with the given starting balance
    pub fn with_balance(balance: Option<i32>) -> Self {
        let user_id = Uuid::new_v4();
        let verifier = Arc::new(MockVerifier::new(user_id));
        let credits = Arc::new(MockCreditStore::new(balance));
        let model = Arc::new(MockModel::new(ModelBehavior::Reply(
            "Here is the generated answer.".to_string(),
        )));

        let state = AppState::new(
            test_config(),
            verifier.clone(),
            credits.clone(),
            model.clone(),
        );

        TestContext {
            app: build_router(state),
            verifier,
            credits,
            model,
        }
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        "Bearer test-token".to_string()
    }
}

fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/gengate_test".to_string(),
            max_connections: 5,
        },
        auth: AuthConfig {
            url: "http://127.0.0.1:65535".to_string(),
            api_key: "test-anon-key".to_string(),
        },
        gemini: GeminiConfig {
            api_key: "test-gemini-key".to_string(),
            model: "gemini-test".to_string(),
            api_url: "http://127.0.0.1:65535".to_string(),
        },
    }
}

/// Builds a JSON POST request, optionally with an authorization header
pub fn json_post(uri: &str, auth: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

/// Reads a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Captures formatted tracing output for log assertions
///
/// Scope a router call with `future.with_subscriber(capture.subscriber())`
/// and assert on `contents()` afterwards.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Builds a subscriber that writes formatted events into this capture
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
