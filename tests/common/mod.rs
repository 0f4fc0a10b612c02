#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use kakao_rag_chatbot::config::Config;
use kakao_rag_chatbot::error::{GenerationError, IdentityError, PersistenceError, RetrievalError};
use kakao_rag_chatbot::services::generation::Generator;
use kakao_rag_chatbot::services::identity::{
    AccessToken, IdentityProvider, KakaoProfile, ProfileProperties,
};
use kakao_rag_chatbot::services::retrieval::{RetrievedPassage, Retriever};
use kakao_rag_chatbot::services::user_store::{MemoryUserStore, UserRecord, UserStore};
use kakao_rag_chatbot::state::{AppState, SharedState};

pub const LIVE_CREDENTIALS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "sk-test"),
    ("PINECONE_API_KEY", "pc-test"),
    ("PINECONE_INDEX_NAME", "neoliberalism"),
];

pub fn config(pairs: &[(&str, &str)]) -> Config {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}

pub enum RetrieverMode {
    Passages(Vec<&'static str>),
    Fail,
    Hang,
}

pub struct StubRetriever {
    mode: RetrieverMode,
    pub calls: AtomicUsize,
}

impl StubRetriever {
    pub fn new(mode: RetrieverMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            RetrieverMode::Passages(texts) => Ok(texts
                .iter()
                .map(|t| RetrievedPassage {
                    text: t.to_string(),
                })
                .collect()),
            RetrieverMode::Fail => Err(RetrievalError::DimensionMismatch {
                got: 1536,
                expected: 3072,
            }),
            RetrieverMode::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

pub enum GeneratorMode {
    Answer(&'static str),
    Fail,
    Hang,
}

pub struct StubGenerator {
    mode: GeneratorMode,
    pub seen: Mutex<Vec<(String, String)>>,
}

impl StubGenerator {
    pub fn new(mode: GeneratorMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, context: &str, query: &str) -> Result<String, GenerationError> {
        self.seen
            .lock()
            .unwrap()
            .push((context.to_string(), query.to_string()));
        match &self.mode {
            GeneratorMode::Answer(text) => Ok(text.to_string()),
            GeneratorMode::Fail => Err(GenerationError::Status {
                status: 429,
                body: "rate limited".into(),
            }),
            GeneratorMode::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
        }
    }
}

#[derive(Default)]
pub struct StubIdentity {
    pub fail_exchange: bool,
    pub fail_profile: bool,
    pub fail_revoke: bool,
    pub kakao_id: i64,
    pub revoked: AtomicUsize,
    pub redirect_uris: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    fn authorize_url(&self, redirect_uri: &str) -> Result<String, IdentityError> {
        Ok(format!(
            "https://kauth.kakao.com/oauth/authorize?client_id=test&redirect_uri={redirect_uri}&response_type=code"
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, IdentityError> {
        self.redirect_uris
            .lock()
            .unwrap()
            .push(redirect_uri.to_string());
        if self.fail_exchange {
            return Err(IdentityError::Status {
                step: "token exchange",
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.into(),
            });
        }
        Ok(AccessToken {
            access_token: format!("token-for-{code}"),
            expires_in: 21599,
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<KakaoProfile, IdentityError> {
        if self.fail_profile {
            return Err(IdentityError::Status {
                step: "profile fetch",
                status: 401,
                body: "expired".into(),
            });
        }
        Ok(KakaoProfile {
            id: self.kakao_id,
            properties: Some(ProfileProperties {
                nickname: Some("테스터".into()),
                profile_image: None,
            }),
            kakao_account: None,
        })
    }

    async fn revoke(&self, _access_token: &str) -> Result<(), IdentityError> {
        self.revoked.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke {
            return Err(IdentityError::Status {
                step: "logout",
                status: 401,
                body: "expired".into(),
            });
        }
        Ok(())
    }
}

/// Store whose writes always fail, as when the database is unreachable.
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn upsert(&self, _profile: &KakaoProfile) -> Result<UserRecord, PersistenceError> {
        Err(PersistenceError::Timeout)
    }
}

pub struct TestApp {
    pub state: SharedState,
    pub users: MemoryUserStore,
}

pub fn app_with(
    config: Config,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    identity: Arc<dyn IdentityProvider>,
) -> TestApp {
    let users = MemoryUserStore::new();
    let state = state_with_store(config, retriever, generator, identity, Arc::new(users.clone()));
    TestApp { state, users }
}

pub fn state_with_store(
    config: Config,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn UserStore>,
) -> SharedState {
    Arc::new(AppState::with_components(
        config, retriever, generator, identity, store,
    ))
}

/// App without live credentials: every chat answer comes from the fallback table.
pub fn offline_app() -> TestApp {
    app_with(
        config(&[]),
        StubRetriever::new(RetrieverMode::Fail),
        StubGenerator::new(GeneratorMode::Fail),
        Arc::new(StubIdentity::default()),
    )
}

pub fn chat_request(body: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json");
    if let Some(id) = user_id {
        builder = builder.header("cookie", format!("user_id={id}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
