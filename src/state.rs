// src/state.rs
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::services::credential_gate::CredentialGate;
use crate::services::generation::{Generator, OpenAiGenerator};
use crate::services::identity::{IdentityProvider, KakaoClient};
use crate::services::orchestrator::ChatOrchestrator;
use crate::services::retrieval::{PineconeRetriever, Retriever};
use crate::services::user_store::{MemoryUserStore, PgUserStore, UserStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: ChatOrchestrator,
    pub identity: Arc<dyn IdentityProvider>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    /// Wires the live clients described by `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.external_call_timeout)
            .build()
            .context("failed to build http client")?;

        let retriever = Arc::new(PineconeRetriever::from_config(&config, http.clone()));
        let generator = Arc::new(OpenAiGenerator::from_config(&config, http.clone()));
        let identity = Arc::new(KakaoClient::from_config(&config, http));

        let users: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let store = PgUserStore::connect(url)
                    .await
                    .context("failed to connect to user database")?;
                store
                    .migrate()
                    .await
                    .context("failed to create users table")?;
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, users are kept in memory only");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(Self::with_components(config, retriever, generator, identity, users))
    }

    pub fn with_components(
        config: Config,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let orchestrator = ChatOrchestrator::new(
            CredentialGate::from_config(&config),
            retriever,
            generator,
            config.external_call_timeout,
        );
        Self {
            config: Arc::new(config),
            orchestrator,
            identity,
            users,
        }
    }
}
