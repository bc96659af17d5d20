//! Gemini API 客户端
//!
//! 通过 reqwest 调用 generateContent：对话历史原样作为 contents（消息 JSON 形状与 API 一致），
//! 工具声明放进 tools[].functionDeclarations，system instruction 单独传递。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{GenerateRequest, LlmClient, LlmError, ModelResponse};
use crate::memory::{Message, Part};
use crate::tools::ToolDefinition;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// Gemini 客户端：持有 HTTP Client、endpoint 与 API Key
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl GeminiClient {
    pub fn new(
        api_base: Option<&str>,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let base = api_base.unwrap_or(GEMINI_API_BASE).trim_end_matches('/');
        let endpoint = format!("{}/v1beta/models/{}:generateContent", base, model);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            model: model.to_string(),
            usage: TokenUsage::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn translate_request<'a>(&self, request: &'a GenerateRequest) -> GeminiRequest<'a> {
        let system_instruction = if request.system_instruction.trim().is_empty() {
            None
        } else {
            Some(GeminiSystemInstruction {
                parts: vec![Part::text(request.system_instruction.clone())],
            })
        };

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: &request.tools,
            }])
        };

        GeminiRequest {
            contents: &request.contents,
            system_instruction,
            tools,
        }
    }

    /// 取第一个 candidate 的 parts；无法识别的 part（如 inlineData）跳过
    fn normalize_response(resp: GeminiResponse) -> ModelResponse {
        let raw_parts = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let parts: Vec<Part> = raw_parts
            .into_iter()
            .filter_map(|p| match serde_json::from_value::<Part>(p.clone()) {
                Ok(part) => Some(part),
                Err(e) => {
                    tracing::warn!(part = %p, error = %e, "dropping unrecognized response part");
                    None
                }
            })
            .collect();

        let function_calls = parts
            .iter()
            .filter_map(Part::as_function_call)
            .cloned()
            .collect();

        ModelResponse {
            function_calls,
            parts,
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, LlmError> {
        let body = self.translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Network(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::Network(format!("Connection failed: {}", e))
                } else {
                    LlmError::Api(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&text)
                .map(|r| r.error.message)
                .unwrap_or(text);
            return Err(match status.as_u16() {
                400 => LlmError::InvalidRequest(message),
                401 | 403 => LlmError::Auth(message),
                429 => LlmError::RateLimited(message),
                500..=599 => LlmError::Server(message),
                _ => LlmError::Api(format!("HTTP {}: {}", status, message)),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Parse(format!("{}: {}", e, text)))?;

        if let Some(usage) = &parsed.usage_metadata {
            self.usage
                .add(usage.prompt_token_count, usage.candidates_token_count);
        }

        let normalized = Self::normalize_response(parsed);
        tracing::debug!(
            model = %self.model,
            function_calls = normalized.function_calls.len(),
            parts = normalized.parts.len(),
            "gemini response"
        );
        Ok(normalized)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool<'a>>>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool<'a> {
    function_declarations: &'a [ToolDefinition],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
