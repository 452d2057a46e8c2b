use crate::config::Config;
use domain::error::{PipelineError, PipelineResult};
use domain::ports::{ChatProvider, EmbeddingProvider, EmbeddingTask};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use shared::types::Result;
use std::sync::Arc;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Gemini REST API, serving both embeddings and chat.
#[derive(Clone)]
pub struct GeminiClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.api_base.clone(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model, method)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        capability: &'static str,
        url: &str,
        body: &T,
    ) -> PipelineResult<String> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::upstream(capability, e.to_string()))?;
        read_body(capability, response).await
    }
}

async fn read_body(capability: &'static str, response: Response) -> PipelineResult<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PipelineError::upstream(capability, e.to_string()))?;
    if !status.is_success() {
        return Err(PipelineError::upstream(
            capability,
            describe_api_error(status.as_u16(), &text),
        ));
    }
    Ok(text)
}

fn describe_api_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.status.is_empty() => {
            format!("HTTP {status} {}: {}", parsed.error.status, parsed.error.message)
        }
        Ok(parsed) => format!("HTTP {status}: {}", parsed.error.message),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

fn task_type(task: EmbeddingTask) -> &'static str {
    match task {
        EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingTask::Query => "RETRIEVAL_QUERY",
    }
}

fn parse_embeddings(body: &str, expected: usize) -> PipelineResult<Vec<Vec<f32>>> {
    let parsed: BatchEmbedResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::upstream("embedding", format!("malformed response: {e}")))?;
    if parsed.embeddings.len() != expected {
        return Err(PipelineError::upstream(
            "embedding",
            format!(
                "expected {expected} embeddings, received {}",
                parsed.embeddings.len()
            ),
        ));
    }
    Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
}

fn parse_completion(body: &str) -> PipelineResult<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::upstream("chat", format!("malformed response: {e}")))?;
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(PipelineError::upstream("chat", reason));
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(PipelineError::upstream(
            "chat",
            format!("empty completion (finish reason: {reason})"),
        ));
    }
    Ok(text)
}

impl EmbeddingProvider for GeminiClient {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> PipelineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&self.embedding_model, "batchEmbedContents");
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.embedding_model,
                    content: Content {
                        role: None,
                        parts: vec![Part { text: text.as_str() }],
                    },
                    task_type: task_type(task),
                })
                .collect(),
        };
        debug!(count = texts.len(), model = %self.embedding_model, "requesting embeddings");
        let body = self.post("embedding", &url, &request).await?;
        parse_embeddings(&body, texts.len())
    }
}

impl ChatProvider for GeminiClient {
    fn model(&self) -> &str {
        &self.chat_model
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> PipelineResult<String> {
        let url = self.endpoint(&self.chat_model, "generateContent");
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };
        debug!(model = %self.chat_model, prompt_chars = prompt.len(), "requesting completion");
        let body = self.post("chat", &url, &request).await?;
        parse_completion(&body)
    }
}
