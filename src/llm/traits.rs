//! LLM 客户端抽象
//!
//! 所有后端（Gemini / Mock）实现 LlmClient：generate 接收完整对话、工具声明与 system instruction，
//! 返回工具调用或最终内容。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::{FunctionCall, Message, Part};
use crate::tools::ToolDefinition;

/// 模型调用错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("{0}")]
    Api(String),
}

/// 一次模型调用的请求：system instruction + 清洗后的对话 + 全量工具声明
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub contents: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// 模型回复：要么带工具调用，要么带最终内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub function_calls: Vec<FunctionCall>,
    pub parts: Vec<Part>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            function_calls: Vec::new(),
            parts: vec![Part::text(text)],
        }
    }

    pub fn call(call: FunctionCall) -> Self {
        Self {
            function_calls: vec![call.clone()],
            parts: vec![Part::FunctionCall {
                function_call: call,
            }],
        }
    }

    /// 只取第一个工具调用（不支持单轮并行调用）
    pub fn first_call(&self) -> Option<&FunctionCall> {
        self.function_calls.first()
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
