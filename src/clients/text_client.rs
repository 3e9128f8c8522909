use crate::{
    clients::{build_http_client, transport_error, CompletionService},
    config::OpenAiConfig,
    error::{ClientError, ConfigError, Result},
    models::{ChatCompletionBody, ChatCompletionResponse, CompletionRequest, OpenAiErrorResponse},
};
use async_trait::async_trait;
use std::time::Duration;

/// Chat-completions client for the OpenAI API.
#[derive(Clone)]
pub struct OpenAiTextClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiTextClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        Ok(Self {
            http: build_http_client(config.timeout)?,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenAiTextClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        log::info!("Invoking completion model: {}", self.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if !status.is_success() {
            log::error!("Completion service returned {}: {}", status, text);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?;
        first_choice_text(parsed)
    }
}

fn first_choice_text(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ClientError::EmptyResponse("completion has no message content".into()))
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<OpenAiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}
