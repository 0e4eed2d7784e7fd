use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;

use crate::config::{AssistantConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::errors::RemoteCallError;
use crate::types::*;

/// Anything that can turn a conversation into the next assistant reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// `history` is ordered oldest first and ends with the user's latest turn.
    async fn reply(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String, RemoteCallError>;
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LlmClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &AssistantConfig) -> Result<Self, RemoteCallError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(RemoteCallError::MissingApiKey)?;

        let timeout = Duration::from_secs(config.request_timeout_secs.unwrap_or(60));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteCallError::RequestError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model_name: config
                .model_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: config
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Builds the request body: system instruction first, then the turns in order.
    pub fn build_request(&self, system_prompt: &str, history: &[ChatTurn]) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage::system(system_prompt));
        messages.extend(history.iter().map(WireMessage::from));

        ChatCompletionRequest {
            model: self.model_name.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Send a chat completions request; one attempt, no retry
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, RemoteCallError> {
        let url = self.completions_url();
        debug!("POST {} ({} messages)", url, request.messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| RemoteCallError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                RemoteCallError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(RemoteCallError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| RemoteCallError::ParsingError(format!("Failed to parse response: {}", e)))
    }
}

/// Helper method to extract text from a response
pub fn extract_text_from_response(response: &ChatCompletionResponse) -> Result<String, RemoteCallError> {
    let choice = response
        .choices
        .first()
        .ok_or_else(|| RemoteCallError::ResponseError("No choices in response".to_string()))?;

    let text = choice
        .message
        .as_ref()
        .and_then(|m| m.content.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RemoteCallError::ResponseError("No text in choice".to_string()))?;

    Ok(text.to_string())
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn reply(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String, RemoteCallError> {
        let request = self.build_request(system_prompt, history);
        info!("Calling model {} with {} turns", self.model_name, history.len());
        let response = self.complete(&request).await?;
        extract_text_from_response(&response)
    }
}

/// Stand-in used when no API key is configured; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineModel;

#[async_trait]
impl ChatModel for OfflineModel {
    async fn reply(&self, _system_prompt: &str, _history: &[ChatTurn]) -> Result<String, RemoteCallError> {
        Err(RemoteCallError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(base_url: &str) -> AssistantConfig {
        AssistantConfig {
            api_key: Some("test-key".to_string()),
            api_base_url: Some(base_url.to_string()),
            request_timeout_secs: Some(5),
            ..AssistantConfig::builtin()
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let err = LlmClient::new(&AssistantConfig::builtin()).unwrap_err();
        assert!(matches!(err, RemoteCallError::MissingApiKey));

        let blank = AssistantConfig {
            api_key: Some("   ".to_string()),
            ..AssistantConfig::builtin()
        };
        assert!(matches!(LlmClient::new(&blank), Err(RemoteCallError::MissingApiKey)));
    }

    #[test]
    fn test_build_request_orders_messages() {
        let client = LlmClient::new(&config_with_key(DEFAULT_BASE_URL)).unwrap();
        let history = vec![
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello!"),
            ChatTurn::user("what's up?"),
        ];

        let request = client.build_request("be nice", &history);
        let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(request.messages[0].content, "be nice");
        assert_eq!(request.messages[3].content, "what's up?");
        assert_eq!(request.model, DEFAULT_MODEL);
        assert_eq!(request.temperature, Some(0.7));

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let client = LlmClient::new(&config_with_key("http://localhost:8080/v1/")).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_extract_text() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Sure thing.  "},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_from_response(&response).unwrap(), "Sure thing.");
    }

    #[test]
    fn test_extract_text_rejects_empty() {
        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_text_from_response(&empty),
            Err(RemoteCallError::ResponseError(_))
        ));

        let no_content: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap();
        assert!(extract_text_from_response(&no_content).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        // Nothing listens on the discard port locally
        let client = LlmClient::new(&config_with_key("http://127.0.0.1:9/v1")).unwrap();
        let err = client.reply("sys", &[ChatTurn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, RemoteCallError::RequestError(_)));
    }

    #[tokio::test]
    async fn test_offline_model_always_fails() {
        let err = OfflineModel.reply("sys", &[]).await.unwrap_err();
        assert!(matches!(err, RemoteCallError::MissingApiKey));
    }
}
