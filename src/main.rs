use std::sync::Arc;

use anyhow::Context;
use kakao_rag_chatbot::{config::Config, routes, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr;

    let state = AppState::from_config(config).await?;
    let app = routes::create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("chatbot running at http://{bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
