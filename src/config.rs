//! Runtime configuration, read once at start-up from the environment (and an
//! optional `.env` file) into a strongly typed [`Config`] that is handed to every
//! component by reference.
use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 3072;
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:3000";
pub const KAKAO_CALLBACK_PATH: &str = "/auth/kakao/callback";

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub openai_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub pinecone_index_name: Option<String>,
    pub pinecone_control_url: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub top_k: usize,
    pub external_call_timeout: Duration,
    pub kakao_client_id: Option<String>,
    pub kakao_client_secret: Option<String>,
    pub public_origin: String,
    pub production: bool,
    pub database_url: Option<String>,
    pub guard: GuardConfig,
}

/// Paths watched by the route guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardConfig {
    /// `/` only matches itself; every other entry matches as a prefix.
    pub protected_paths: Vec<String>,
    pub login_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_paths: vec!["/".into(), "/dashboard".into(), "/profile".into()],
            login_path: "/login".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = parse_or(&get, "BIND_ADDR", DEFAULT_BIND_ADDR.parse::<SocketAddr>()?)?;
        let embedding_dimension =
            parse_or(&get, "EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?;
        let chat_temperature = parse_or(&get, "CHAT_TEMPERATURE", DEFAULT_CHAT_TEMPERATURE)?;
        let top_k = parse_or(&get, "RETRIEVAL_TOP_K", DEFAULT_TOP_K)?;
        let timeout_secs = parse_or(&get, "EXTERNAL_CALL_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let guard = match get("PROTECTED_PATHS") {
            Some(list) => GuardConfig {
                protected_paths: list
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect(),
                login_path: get("LOGIN_PATH").unwrap_or_else(|| "/login".into()),
            },
            None => GuardConfig {
                login_path: get("LOGIN_PATH").unwrap_or_else(|| "/login".into()),
                ..GuardConfig::default()
            },
        };

        Ok(Config {
            bind_addr,
            openai_api_key: get("OPENAI_API_KEY"),
            pinecone_api_key: get("PINECONE_API_KEY"),
            pinecone_index_name: get("PINECONE_INDEX_NAME"),
            pinecone_control_url: get("PINECONE_CONTROL_URL")
                .unwrap_or_else(|| DEFAULT_PINECONE_CONTROL_URL.into()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            embedding_dimension,
            chat_model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
            chat_temperature,
            top_k,
            external_call_timeout: Duration::from_secs(timeout_secs),
            kakao_client_id: get("KAKAO_CLIENT_ID"),
            kakao_client_secret: get("KAKAO_CLIENT_SECRET"),
            public_origin: get("PUBLIC_ORIGIN")
                .map(|o| o.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PUBLIC_ORIGIN.into()),
            production: get("APP_ENV").is_some_and(|e| e.eq_ignore_ascii_case("production")),
            database_url: get("DATABASE_URL"),
            guard,
        })
    }

    /// Redirect URI registered with the identity provider. Must match exactly.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.public_origin, KAKAO_CALLBACK_PATH)
    }

    /// Cookies carry the `Secure` flag everywhere but local development.
    pub fn secure_cookies(&self) -> bool {
        self.production
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
