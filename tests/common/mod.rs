#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{ Request, StatusCode };
use axum::Router;
use serde_json::Value;
use social_agent::agent::PostAgent;
use social_agent::auth::{ AuthError, Identity, IdentityVerifier };
use social_agent::llm::chat::{ ChatClient, CompletionResponse };
use social_agent::models::chat::{ ChatMessage, ConversationSummary, Role };
use social_agent::server::{ router, AppState };
use social_agent::store::{ ConversationStore, MemoryStore, StoreError };
use std::error::Error as StdError;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;
use tower::ServiceExt;

pub const ALICE: &str = "token-alice";
pub const BOB: &str = "token-bob";

/// Accepts `token-<uid>` for a fixed set of users.
#[derive(Default)]
pub struct StubVerifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match token {
            ALICE => Ok(Identity { uid: "alice".into(), email: Some("alice@example.com".into()) }),
            BOB => Ok(Identity { uid: "bob".into(), email: None }),
            other => Err(AuthError::UnknownKey(other.to_string())),
        }
    }
}

/// Memory store that counts calls and can be told to fail.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub calls: AtomicUsize,
    /// Attempted writes, including failed ones.
    pub writes: AtomicUsize,
    pub fail_reads: bool,
    /// Writes beyond the first `n` fail.
    pub fail_writes_after: Option<usize>,
}

impl CountingStore {
    pub fn failing_reads() -> Self {
        Self { fail_reads: true, ..Self::default() }
    }

    pub fn failing_writes_after(n: usize) -> Self {
        Self { fail_writes_after: Some(n), ..Self::default() }
    }

    fn record_write(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let done = self.writes.fetch_add(1, Ordering::SeqCst);
        match self.fail_writes_after {
            Some(limit) if done >= limit => Err(Self::unavailable()),
            _ => Ok(()),
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Status { status: 503, body: "unavailable".into() }
    }
}

#[async_trait]
impl ConversationStore for CountingStore {
    async fn create_conversation(
        &self,
        uid: &str,
        title: &str,
        created_at: &str
    ) -> Result<String, StoreError> {
        self.record_write()?;
        self.inner.create_conversation(uid, title, created_at).await
    }

    async fn add_message(
        &self,
        uid: &str,
        chat_id: &str,
        role: Role,
        text: &str,
        created_at: &str
    ) -> Result<String, StoreError> {
        self.record_write()?;
        self.inner.add_message(uid, chat_id, role, text, created_at).await
    }

    async fn list_conversations(&self, uid: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.inner.list_conversations(uid).await
    }

    async fn list_messages(&self, uid: &str, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.inner.list_messages(uid, chat_id).await
    }
}

/// Generator returning a canned reply, or failing when `reply` is `None`.
pub struct StubChat {
    pub calls: AtomicUsize,
    pub prompts: std::sync::Mutex<Vec<String>>,
    reply: Option<String>,
}

impl StubChat {
    pub fn replying(reply: &str) -> Self {
        Self { calls: AtomicUsize::new(0), prompts: Default::default(), reply: Some(reply.into()) }
    }

    pub fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), prompts: Default::default(), reply: None }
    }
}

#[async_trait]
impl ChatClient for StubChat {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(text) => Ok(CompletionResponse { response: text.clone() }),
            None => Err("quota exceeded".into()),
        }
    }

    fn get_model(&self) -> String {
        "stub".into()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

pub struct TestApp {
    pub router: Router,
    pub verifier: Arc<StubVerifier>,
    pub store: Arc<CountingStore>,
    pub chat: Arc<StubChat>,
}

impl TestApp {
    pub fn new(store: CountingStore, chat: StubChat) -> Self {
        let verifier = Arc::new(StubVerifier::default());
        let store = Arc::new(store);
        let chat = Arc::new(chat);
        let agent = Arc::new(PostAgent::new(store.clone(), chat.clone()));
        let router = router(AppState::new(verifier.clone(), agent));
        Self { router, verifier, store, chat }
    }

    pub fn healthy() -> Self {
        Self::new(CountingStore::default(), StubChat::replying("Fresh kicks just dropped! #sneakers"))
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
        (status, bytes.to_vec())
    }

    pub async fn send_json(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(req).await;
        let json = serde_json::from_slice(&bytes).expect("parse JSON");
        (status, json)
    }

    pub fn verifier_calls(&self) -> usize {
        self.verifier.calls.load(Ordering::SeqCst)
    }

    pub fn store_calls(&self) -> usize {
        self.store.calls.load(Ordering::SeqCst)
    }

    pub fn store_writes(&self) -> usize {
        self.store.writes.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat.calls.load(Ordering::SeqCst)
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn sneaker_brief() -> Value {
    serde_json::json!({
        "topic": "Launch of new sneaker",
        "platform": "Instagram",
        "tone": "Excited"
    })
}
