use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::GenerationError};

/// Persona and grounding rules. The model must admit ignorance rather than
/// answer outside the supplied context.
const SYSTEM_TEMPLATE: &str = "당신은 정치경제학과 신자유주의에 대한 전문가입니다.
주어진 컨텍스트를 기반으로 사용자의 질문에 답변해주세요.
컨텍스트에 관련 정보가 없다면, 모르겠다고 솔직하게 대답하세요.
답변은 친절하고 명확하게 해주세요.

컨텍스트:
";

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, context: &str, query: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// System instruction with the retrieved context, followed by the user's question.
pub fn build_messages(context: &str, query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: format!("{SYSTEM_TEMPLATE}{context}"),
        },
        ChatMessage {
            role: "user",
            content: query.to_string(),
        },
    ]
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.chat_model.clone(),
            temperature: config.chat_temperature,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, context: &str, query: &str) -> Result<String, GenerationError> {
        let req = CompletionRequest {
            model: &self.model,
            messages: build_messages(context, query),
            temperature: self.temperature,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.as_deref().unwrap_or_default())
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let body: CompletionResponse = resp.json().await?;
        first_content(body)
    }
}

fn first_content(body: CompletionResponse) -> Result<String, GenerationError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyCompletion)
}
