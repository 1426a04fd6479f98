use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use snapledger_ingest::Inference;
use std::time::Duration;
use tracing::debug;

use crate::config::{LlmSection, Provider, normalize_model};

/// Single-prompt completion against one of the supported HTTP APIs.
pub struct HttpInference {
    provider: Provider,
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Serialize, Deserialize)]
struct Msg {
    role: String,
    content: String,
}

fn user_message(prompt: &str) -> Vec<Msg> {
    vec![Msg {
        role: "user".to_string(),
        content: prompt.to_string(),
    }]
}

impl HttpInference {
    pub fn new(cfg: &LlmSection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build http client")?;

        Ok(Self {
            provider: cfg.provider,
            model: normalize_model(&cfg.model).to_string(),
            base_url: cfg.base_url().to_string(),
            api_key: cfg.api_key.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client,
        })
    }

    async fn openai_complete(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Req {
            model: String,
            messages: Vec<Msg>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: self.model.clone(),
            messages: user_message(prompt),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let resp = req.send().await.context("openai request")?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }

    async fn anthropic_complete(&self, prompt: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing anthropic api key; set ANTHROPIC_API_KEY"))?;

        #[derive(Serialize)]
        struct Req {
            model: String,
            max_tokens: u32,
            temperature: f32,
            messages: Vec<Msg>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: user_message(prompt),
        };

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(key)?);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let mut s = String::new();
        for b in out.content {
            if b.t == "text" {
                if let Some(t) = b.text {
                    s.push_str(&t);
                }
            }
        }
        Ok(s.trim().to_string())
    }

    async fn ollama_complete(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Req {
            model: String,
            messages: Vec<Msg>,
            stream: bool,
            options: Options,
        }

        #[derive(Serialize)]
        struct Options {
            temperature: f32,
            num_predict: u32,
        }

        #[derive(Deserialize)]
        struct Resp {
            message: Msg,
        }

        let body = Req {
            model: self.model.clone(),
            messages: user_message(prompt),
            stream: false,
            options: Options {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .context("ollama request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("ollama error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse ollama response")?;
        Ok(out.message.content.trim().to_string())
    }
}

#[async_trait]
impl Inference for HttpInference {
    fn name(&self) -> &str {
        match self.provider {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
        }
    }

    async fn infer(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = self.name(),
            model = %self.model,
            base_url = %self.base_url,
            "inference request"
        );
        match self.provider {
            Provider::OpenAI => self.openai_complete(prompt).await,
            Provider::Anthropic => self.anthropic_complete(prompt).await,
            Provider::Ollama => self.ollama_complete(prompt).await,
        }
    }
}
