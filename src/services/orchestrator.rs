//! Chat request pipeline: credential gate, then either the fallback table or
//! retrieval followed by generation. External failures never reach the caller;
//! they are replaced by a degraded fallback answer.
use std::{sync::Arc, time::Duration};

use tokio::time::timeout;

use crate::{
    error::{AppError, GenerationError, RetrievalError},
    message::{ChatRequest, ChatResponse},
    services::{
        credential_gate::CredentialGate,
        fallback,
        generation::Generator,
        retrieval::{Retriever, join_context},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Generated from retrieved context.
    Live,
    /// Credentials missing; answered from the fallback table.
    Fallback,
    /// Live pipeline failed; answered from the fallback table.
    Degraded,
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    gate: CredentialGate,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    call_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        gate: CredentialGate,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            gate,
            retriever,
            generator,
            call_timeout,
        }
    }

    /// Validates the message and produces an answer. Only a missing message is
    /// an error; every other path yields a non-empty response.
    pub async fn handle(
        &self,
        user_id: &str,
        request: ChatRequest,
    ) -> Result<ChatResponse, AppError> {
        let message = request
            .into_message()
            .ok_or_else(AppError::message_required)?;

        let (response, outcome) = self.answer(&message).await;
        tracing::info!(user_id, ?outcome, "chat answered");

        Ok(ChatResponse {
            response,
            user_id: user_id.to_string(),
        })
    }

    pub async fn answer(&self, message: &str) -> (String, ChatOutcome) {
        if !self.gate.check() {
            return (fallback::respond(message), ChatOutcome::Fallback);
        }

        match self.run_pipeline(message).await {
            Ok(text) => (text, ChatOutcome::Live),
            Err(err) => {
                tracing::error!(error = %err, "live pipeline failed, serving backup answer");
                (fallback::degraded(message), ChatOutcome::Degraded)
            }
        }
    }

    async fn run_pipeline(&self, message: &str) -> Result<String, PipelineError> {
        tracing::debug!(query = message, "retrieving context");
        let passages = timeout(self.call_timeout, self.retriever.retrieve(message))
            .await
            .map_err(|_| RetrievalError::Timeout)??;
        let context = join_context(&passages);
        tracing::debug!(passages = passages.len(), "context retrieved");

        let answer = timeout(self.call_timeout, self.generator.generate(&context, message))
            .await
            .map_err(|_| GenerationError::Timeout)??;
        tracing::debug!(
            preview = %answer.chars().take(50).collect::<String>(),
            "generation complete"
        );
        Ok(answer)
    }
}
