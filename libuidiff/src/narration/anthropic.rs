//! Anthropic `/v1/messages` provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{NarrationProvider, NarrationRequest, SYSTEM_PROMPT};
use crate::error::NarrationError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'static str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnthropicNarrator {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicNarrator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NarrationError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(NarrationError::MissingApiKey("ANTHROPIC_API_KEY"));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client,
        })
    }

    fn build_request<'a>(&'a self, request: &'a NarrationRequest) -> MessagesRequest<'a> {
        let mut content = vec![ContentBlock::Text {
            text: request.prompt,
        }];
        content.extend(request.images().into_iter().map(|image| ContentBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: image.media_type,
                data: image.to_base64(),
            },
        }));

        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

fn collect_text(response: MessagesResponse) -> Result<String, NarrationError> {
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        return Err(NarrationError::Malformed(
            "response has no text content".to_string(),
        ));
    }
    Ok(text.join("\n"))
}

#[async_trait]
impl NarrationProvider for AnthropicNarrator {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        let body = self.build_request(request);
        let url = format!("{}/v1/messages", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        collect_text(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::ImagePayload;

    #[test]
    fn test_request_shape() {
        let n = AnthropicNarrator::new(DEFAULT_BASE_URL, "key", DEFAULT_MODEL, Duration::from_secs(5))
            .unwrap();
        let request = NarrationRequest::new(
            ImagePayload::new(vec![0], "image/png"),
            ImagePayload::new(vec![1], "image/png"),
        );
        let body = serde_json::to_value(n.build_request(&request)).unwrap();

        assert_eq!(body["system"], SYSTEM_PROMPT);
        assert_eq!(body["temperature"], 0.0);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[1]["source"]["type"], "base64");
        assert_eq!(content[1]["source"]["data"], "AA==");
        assert_eq!(content[2]["source"]["data"], "AQ==");
    }

    #[test]
    fn test_collect_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"a"},{"type":"tool_use"},{"type":"text","text":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(collect_text(response).unwrap(), "a\nb");
    }

    #[test]
    fn test_empty_content_is_malformed() {
        let response: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(matches!(collect_text(response), Err(NarrationError::Malformed(_))));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let err = AnthropicNarrator::new(DEFAULT_BASE_URL, "", DEFAULT_MODEL, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, NarrationError::MissingApiKey("ANTHROPIC_API_KEY")));
    }
}
