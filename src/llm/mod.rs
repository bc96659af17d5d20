//! LLM 层：客户端抽象与实现（Gemini / Mock）

pub mod gemini;
pub mod mock;
pub mod traits;

pub use gemini::{GeminiClient, TokenUsage, GEMINI_API_BASE, GEMINI_FLASH};
pub use mock::MockLlmClient;
pub use traits::{GenerateRequest, LlmClient, LlmError, ModelResponse};
