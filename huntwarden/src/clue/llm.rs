// huntwarden/src/clue/llm.rs
//
// LLM provider clients.
//
//   OpenAiClient   POST {base}/chat/completions                  (Bearer key)
//   GeminiClient   POST {base}/models/{model}:generateContent?key=…
//
// Both share one reqwest::Client with the configured request timeout. A
// provider without an API key is still constructed and reports
// `LlmError::NotConfigured` per call, so callers fall back the same way they
// do for network failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::LlmError;

#[derive(Debug, Clone)]
pub struct Completion {
    pub system:      Option<String>,
    pub prompt:      String,
    pub temperature: f32,
    pub max_tokens:  u32,
}

impl Completion {
    pub fn new(prompt: impl Into<String>, cfg: &LlmConfig) -> Self {
        Self {
            system:      None,
            prompt:      prompt.into(),
            temperature: cfg.temperature,
            max_tokens:  cfg.max_tokens,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, req: &Completion) -> Result<String, LlmError>;
}

/// The provider pair every generator works with.
#[derive(Clone)]
pub struct Providers {
    pub openai: Arc<dyn LlmProvider>,
    pub gemini: Arc<dyn LlmProvider>,
}

impl Providers {
    pub fn from_config(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            openai: Arc::new(OpenAiClient::new(http.clone(), cfg)),
            gemini: Arc::new(GeminiClient::new(http, cfg)),
        })
    }
}

fn http_err(provider: &'static str) -> impl Fn(reqwest::Error) -> LlmError {
    move |source| LlmError::Http { provider, source }
}

async fn check_status(provider: &'static str, resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Status { provider, status: status.as_u16(), body })
}

// ── OpenAI ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model:       &'a str,
    messages:    Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens:  u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role:    &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    http:     Client,
    base_url: String,
    model:    String,
    api_key:  Option<String>,
}

impl OpenAiClient {
    pub fn new(http: Client, cfg: &LlmConfig) -> Self {
        Self {
            http,
            base_url: cfg.openai_base_url.trim_end_matches('/').to_string(),
            model:    cfg.openai_model.clone(),
            api_key:  cfg.openai_api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    fn name(&self) -> &'static str { "openai" }

    async fn complete(&self, req: &Completion) -> Result<String, LlmError> {
        let provider = self.name();
        let key = self.api_key.as_deref().ok_or(LlmError::NotConfigured { provider })?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &req.system {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &req.prompt });

        let body = ChatRequest {
            model:       &self.model,
            messages,
            temperature: req.temperature,
            max_tokens:  req.max_tokens,
        };

        debug!(model = %self.model, temperature = req.temperature, "openai chat completion");
        let resp = self.http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(http_err(provider))?;
        let parsed: ChatResponse = check_status(provider, resp).await?
            .json()
            .await
            .map_err(http_err(provider))?;

        parsed.choices.into_iter()
            .find_map(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(LlmError::EmptyResponse { provider })
    }
}

// ── Gemini ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents:          Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature:       f32,
    top_p:             f32,
    top_k:             u32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    http:     Client,
    base_url: String,
    model:    String,
    api_key:  Option<String>,
}

impl GeminiClient {
    pub fn new(http: Client, cfg: &LlmConfig) -> Self {
        Self {
            http,
            base_url: cfg.gemini_base_url.trim_end_matches('/').to_string(),
            model:    cfg.gemini_model.clone(),
            api_key:  cfg.gemini_api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &'static str { "gemini" }

    async fn complete(&self, req: &Completion) -> Result<String, LlmError> {
        let provider = self.name();
        let key = self.api_key.as_deref().ok_or(LlmError::NotConfigured { provider })?;

        let text = match &req.system {
            Some(system) => format!("{}\n\n{}", system, req.prompt),
            None         => req.prompt.clone(),
        };
        let body = GenerateRequest {
            contents: vec![GeminiContent { parts: vec![GeminiPart { text: &text }] }],
            generation_config: GenerationConfig {
                temperature:       req.temperature,
                top_p:             0.8,
                top_k:             40,
                max_output_tokens: req.max_tokens,
            },
        };

        debug!(model = %self.model, "gemini generate content");
        let resp = self.http
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(http_err(provider))?;
        let parsed: GenerateResponse = check_status(provider, resp).await?
            .json()
            .await
            .map_err(http_err(provider))?;

        let joined: String = parsed.candidates.into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            return Err(LlmError::EmptyResponse { provider });
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: returns `reply` or fails as not configured.
    pub struct StaticProvider {
        pub name:  &'static str,
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    impl StaticProvider {
        pub fn ok(name: &'static str, reply: &str) -> Arc<Self> {
            Arc::new(Self { name, reply: Some(reply.to_string()), calls: AtomicUsize::new(0) })
        }

        pub fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, reply: None, calls: AtomicUsize::new(0) })
        }

        pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        fn name(&self) -> &'static str { self.name }

        async fn complete(&self, _req: &Completion) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(LlmError::NotConfigured { provider: self.name })
        }
    }

    pub fn offline() -> Providers {
        Providers {
            openai: StaticProvider::failing("openai"),
            gemini: StaticProvider::failing("gemini"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let p = Providers::from_config(&LlmConfig::default()).unwrap();
        let req = Completion::new("hi", &LlmConfig::default());
        assert!(matches!(p.openai.complete(&req).await, Err(LlmError::NotConfigured { provider: "openai" })));
        assert!(matches!(p.gemini.complete(&req).await, Err(LlmError::NotConfigured { provider: "gemini" })));
    }

    #[tokio::test]
    async fn openai_reads_first_choice() {
        let app = Router::new().route("/chat/completions", post(|Json(body): Json<Value>| async move {
            assert_eq!(body["messages"][0]["role"], "system");
            assert_eq!(body["messages"][1]["content"], "where?");
            Json(json!({"choices": [{"message": {"role": "assistant", "content": "  Under the bridge. "}}]}))
        }));
        let cfg = LlmConfig {
            openai_api_key:  Some("sk-test".into()),
            openai_base_url: serve(app).await,
            ..LlmConfig::default()
        };
        let client = OpenAiClient::new(Client::new(), &cfg);
        let out = client.complete(&Completion::new("where?", &cfg).with_system("guide")).await.unwrap();
        assert_eq!(out, "Under the bridge.");
    }

    #[tokio::test]
    async fn gemini_joins_parts_and_surfaces_status() {
        let app = Router::new().route("/models/*rest", post(
            |Path(rest): Path<String>, Json(body): Json<Value>| async move {
                if rest != "gemini-pro:generateContent" {
                    return Err(StatusCode::NOT_FOUND);
                }
                assert_eq!(body["generationConfig"]["topK"], 40);
                Ok(Json(json!({"candidates": [{"content": {"parts": [{"text": "Count "}, {"text": "the steps."}]}}]})))
            }));
        let cfg = LlmConfig {
            gemini_api_key:  Some("g-test".into()),
            gemini_base_url: serve(app).await,
            ..LlmConfig::default()
        };
        let client = GeminiClient::new(Client::new(), &cfg);
        assert_eq!(client.complete(&Completion::new("p", &cfg)).await.unwrap(), "Count the steps.");

        let broken = LlmConfig { gemini_model: "missing".into(), ..cfg };
        let client = GeminiClient::new(Client::new(), &broken);
        assert!(matches!(client.complete(&Completion::new("p", &broken)).await,
                         Err(LlmError::Status { status: 404, .. })));
    }
}
