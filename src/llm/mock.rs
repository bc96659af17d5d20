//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - scripted：按顺序返回预设回复，用尽后回复固定文本
//! - repeating：每次都返回同一回复（用于验证轮数上限）
//! - demo：根据对话状态生成一页网站 -> 请求预览链接 -> 文本总结，便于本地跑通整条链路

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::llm::{GenerateRequest, LlmClient, LlmError, ModelResponse};
use crate::memory::{FunctionCall, Message, Part, Role};
use crate::tools::site::{GENERATE_SITE_TOOL, PREVIEW_LINK_TOOL};

/// demo 模式写入的站点目录
pub const DEMO_FOLDER: &str = "demo-site";

enum Mode {
    Scripted(Mutex<VecDeque<Result<ModelResponse, LlmError>>>),
    Repeating(ModelResponse),
    Demo,
}

/// Mock 客户端：记录每次调用收到的 contents，便于测试断言
pub struct MockLlmClient {
    mode: Mode,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::demo()
    }
}

impl MockLlmClient {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(responses: Vec<Result<ModelResponse, LlmError>>) -> Self {
        Self::with_mode(Mode::Scripted(Mutex::new(responses.into())))
    }

    pub fn repeating(response: ModelResponse) -> Self {
        Self::with_mode(Mode::Repeating(response))
    }

    pub fn demo() -> Self {
        Self::with_mode(Mode::Demo)
    }

    /// 已被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用收到的 contents（按调用顺序）
    pub fn seen_contents(&self) -> Vec<Vec<Message>> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.contents.clone());

        match &self.mode {
            Mode::Scripted(queue) => queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .unwrap_or_else(|| Ok(ModelResponse::text("(no more scripted responses)"))),
            Mode::Repeating(response) => Ok(response.clone()),
            Mode::Demo => Ok(demo_step(&request.contents)),
        }
    }
}

/// 只看最后一条用户文本之后的工具结果，决定 demo 的下一步
fn demo_step(contents: &[Message]) -> ModelResponse {
    let start = contents
        .iter()
        .rposition(|m| m.role == Role::User && m.parts.iter().any(|p| p.as_text().is_some()))
        .unwrap_or(0);
    let request_text = contents
        .get(start)
        .map(Message::text)
        .unwrap_or_default();
    let last_response = contents[start..]
        .iter()
        .flat_map(|m| m.parts.iter())
        .filter_map(Part::as_function_response)
        .last();

    match last_response {
        None => ModelResponse::call(FunctionCall::new(
            GENERATE_SITE_TOOL,
            json!({
                "folder": DEMO_FOLDER,
                "pages": [{"name": "index.html", "content": demo_page(&request_text)}]
            }),
        )),
        Some(r) if r.name == GENERATE_SITE_TOOL => {
            ModelResponse::call(FunctionCall::new(PREVIEW_LINK_TOOL, json!({"folder": DEMO_FOLDER})))
        }
        Some(r) => ModelResponse::text(format!("Your site is ready. {}", r.response.result)),
    }
}

fn demo_page(request_text: &str) -> String {
    let escaped = request_text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Demo</title></head>\
         <body><h1>Demo site</h1><p>{}</p></body></html>",
        escaped
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(contents: Vec<Message>) -> GenerateRequest {
        GenerateRequest {
            system_instruction: String::new(),
            contents,
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_scripted_in_order_then_fallback() {
        let client = MockLlmClient::scripted(vec![
            Ok(ModelResponse::text("one")),
            Err(LlmError::Server("boom".to_string())),
        ]);
        let req = request(vec![Message::user("hi")]);
        assert_eq!(client.generate(&req).await.unwrap(), ModelResponse::text("one"));
        assert!(client.generate(&req).await.is_err());
        assert!(client.generate(&req).await.is_ok());
        assert_eq!(client.calls(), 3);
        assert_eq!(client.seen_contents().len(), 3);
    }

    #[tokio::test]
    async fn test_demo_walks_generate_preview_text() {
        let client = MockLlmClient::demo();
        let mut contents = vec![Message::user("make a <one-page> site")];

        let first = client.generate(&request(contents.clone())).await.unwrap();
        let call = first.first_call().unwrap();
        assert_eq!(call.name, GENERATE_SITE_TOOL);
        assert!(call.args["pages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("&lt;one-page&gt;"));

        contents.push(Message::function_call(call.clone()));
        contents.push(Message::function_response(GENERATE_SITE_TOOL, "ok"));
        let second = client.generate(&request(contents.clone())).await.unwrap();
        assert_eq!(second.first_call().unwrap().name, PREVIEW_LINK_TOOL);

        contents.push(Message::function_call(second.first_call().unwrap().clone()));
        contents.push(Message::function_response(PREVIEW_LINK_TOOL, "{\"link\":\"x\"}"));
        let third = client.generate(&request(contents)).await.unwrap();
        assert!(third.first_call().is_none());
        assert!(third.parts[0].as_text().unwrap().contains("ready"));
    }
}
