use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

const CHAT_PATH: &str = "/v1/chat/completions";

/// OpenAI chat-completions provider. Works with any endpoint speaking the same
/// wire format when `base_url` points elsewhere.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}{}", self.base_url, CHAT_PATH);

        debug!(model = %req.model, turns = req.messages.len(), "sending request to OpenAI");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000) // seconds to ms
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp)
    }
}

fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    // System instruction goes first as a system-role turn.
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": req.system,
    })];

    for m in &req.messages {
        messages.push(serde_json::json!({
            "role": m.role(),
            "content": m.content(),
        }));
    }

    serde_json::json!({
        "model": req.model,
        "messages": messages,
    })
}

fn parse_response(resp: ApiResponse) -> Result<ChatResponse, ProviderError> {
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(ProviderError::Parse("response contained no choices".into()));
    };

    // A missing `content` on an existing choice is an empty answer, not a malformed one.
    let content = choice.message.content.unwrap_or_default();

    Ok(ChatResponse {
        content,
        model: resp.model,
        tokens_in: resp.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
        tokens_out: resp
            .usage
            .as_ref()
            .map(|u| u.completion_tokens)
            .unwrap_or(0),
        stop_reason: choice.finish_reason.unwrap_or_default(),
    })
}

// OpenAI API response types (private, deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-5-mini".to_string(),
            system: "You are Lyoha.".to_string(),
            messages: vec![
                Message::user("[SENDER: Ann, RECIPIENT: Team]: Leha hi"),
                Message::assistant("Hi Ann"),
            ],
        }
    }

    #[test]
    fn body_prepends_system_turn() {
        let body = build_request_body(&request());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are Lyoha.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(body["model"], "gpt-5-mini");
    }

    #[test]
    fn parses_first_choice() {
        let json = r#"{
            "model": "gpt-5-mini",
            "choices": [{"message": {"content": "Hello!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let resp = parse_response(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(resp.content, "Hello!");
        assert_eq!(resp.tokens_in, 12);
        assert_eq!(resp.tokens_out, 3);
        assert_eq!(resp.stop_reason, "stop");
    }

    #[test]
    fn null_content_is_empty_reply() {
        let json = r#"{"model": "m", "choices": [{"message": {"content": null}, "finish_reason": null}]}"#;
        let resp = parse_response(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(resp.content, "");
    }

    #[test]
    fn no_choices_is_parse_error() {
        let json = r#"{"model": "m", "choices": []}"#;
        let err = parse_response(serde_json::from_str(json).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
