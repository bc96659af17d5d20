//! Agent 错误类型
//!
//! 编排循环不会把这些错误抛给调用方：每个错误最终都会被转成一条诊断消息追加到对话末尾。

use thiserror::Error;

use crate::llm::LlmError;

/// 运行过程中可能出现的错误（模型、工具、参数、路径逃逸等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
