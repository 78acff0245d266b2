use axum::body::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::decoder::DeltaDecoder;
use crate::{config::Config, error::AppError};

/// 单次生成请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub system: Option<String>,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.6
}

fn default_max_tokens() -> u32 {
    120
}

impl CompletionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::InvalidRequest("prompt 不能为空".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::InvalidRequest("temperature 需在 0 到 2 之间".into()));
        }
        if self.max_tokens == 0 {
            return Err(AppError::InvalidRequest("max_tokens 必须大于 0".into()));
        }
        Ok(())
    }

    fn to_body(&self, model: &str) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": self.prompt.trim() }));

        json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": true,
        })
    }
}

pub type TextStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

pub struct TextGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl TextGenerator {
    pub fn from_config(config: &Config, http: reqwest::Client) -> Result<Self, AppError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or(AppError::MissingApiKey)?;
        Ok(Self {
            http,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 发起流式补全，返回只包含文本增量的字节流
    pub async fn stream_text(&self, req: &CompletionRequest) -> Result<TextStream, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req.to_body(&self.model))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!("Completion request failed - Status: {}, Body: {}", status, detail);
            return Err(AppError::UpstreamFailed(format!("upstream status {}", status)));
        }

        let mut decoder = DeltaDecoder::new();
        let stream = resp
            .bytes_stream()
            .map(move |chunk| chunk.map(|bytes| Bytes::from(decoder.push(&bytes))))
            .filter(|chunk| futures_util::future::ready(!matches!(chunk, Ok(b) if b.is_empty())));
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        serde_json::from_value(json!({ "prompt": prompt })).unwrap()
    }

    #[test]
    fn request_defaults() {
        let req = request("Write one line.");
        assert_eq!(req.temperature, 0.6);
        assert_eq!(req.max_tokens, 120);
        assert!(req.system.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_prompt_is_rejected() {
        assert!(matches!(
            request("   ").validate(),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn body_includes_system_message_when_present() {
        let mut req = request(" Write one line. ");
        req.system = Some("Be terse.".into());
        let body = req.to_body("gpt-4o-mini");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Write one line.");
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = Config::default();
        assert!(matches!(
            TextGenerator::from_config(&config, reqwest::Client::new()),
            Err(AppError::MissingApiKey)
        ));
    }
}
