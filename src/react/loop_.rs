//! 工具调用编排主循环
//!
//! 每轮：清洗对话 -> 调用模型 -> 若有工具调用则只执行第一个，回显调用与结果后进入下一轮；
//! 否则追加最终内容并结束。未知工具、轮数耗尽、模型/工具异常都转成诊断消息追加到对话末尾，
//! 循环本身从不向调用方返回错误。

use serde_json::Value;
use tokio::sync::mpsc;

use crate::core::AgentError;
use crate::llm::{GenerateRequest, LlmClient};
use crate::memory::{Conversation, FunctionCall, Message, Role};
use crate::react::ReactEvent;
use crate::tools::{ToolDefinition, ToolExecutor};

/// 单次交换内最多执行的工具轮数，防止死循环
pub const MAX_RETRIES: usize = 10;
/// 轮数耗尽时追加的诊断文本
pub const ABORT_MESSAGE: &str = "❌ Max retries reached. Aborting.";
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

pub fn unknown_tool_message(name: &str) -> String {
    format!("❌ Unknown tool: {}", name)
}

pub fn internal_error_message(err: &AgentError) -> String {
    format!("❌ Internal error: {}", err)
}

/// 编排会话配置：模型、工具执行器、system instruction、轮数上限、可选事件通道
pub struct ReactSession<'a> {
    pub llm: &'a dyn LlmClient,
    pub executor: &'a ToolExecutor,
    pub system_instruction: &'a str,
    pub max_rounds: usize,
    pub event_tx: Option<&'a mpsc::UnboundedSender<ReactEvent>>,
}

impl<'a> ReactSession<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        executor: &'a ToolExecutor,
        system_instruction: &'a str,
    ) -> Self {
        Self {
            llm,
            executor,
            system_instruction,
            max_rounds: MAX_RETRIES,
            event_tx: None,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_event_tx(mut self, tx: &'a mpsc::UnboundedSender<ReactEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, ev: ReactEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

enum Step {
    /// 执行了一次工具调用，进入下一轮
    Continue,
    /// 最终回复或已追加诊断，结束
    Finished,
}

/// 从第 0 轮开始执行
pub async fn run(session: &ReactSession<'_>, conversation: Conversation) -> Conversation {
    run_from(session, conversation, 0).await
}

/// 从指定轮次开始执行；每次工具调用消耗一轮，轮数达到上限时追加中止消息并返回
pub async fn run_from(
    session: &ReactSession<'_>,
    mut conversation: Conversation,
    start_round: usize,
) -> Conversation {
    let tools = session.executor.definitions();
    let mut round = start_round;

    loop {
        session.send_event(ReactEvent::RoundUpdate {
            round,
            max_rounds: session.max_rounds,
        });

        if round >= session.max_rounds {
            tracing::warn!(round, "max rounds reached, aborting exchange");
            conversation.push(Message::model(ABORT_MESSAGE));
            session.send_event(ReactEvent::Error {
                text: ABORT_MESSAGE.to_string(),
            });
            break;
        }

        tracing::debug!(round, max_rounds = session.max_rounds, "round start");
        match step(session, &tools, &mut conversation).await {
            Ok(Step::Continue) => round += 1,
            Ok(Step::Finished) => break,
            Err(e) => {
                tracing::error!(round, error = %e, "exchange failed");
                let text = internal_error_message(&e);
                conversation.push(Message::model(text.clone()));
                session.send_event(ReactEvent::Error { text });
                break;
            }
        }
    }

    session.send_event(ReactEvent::Done);
    conversation
}

/// 单轮：一次模型调用 + 至多一次工具调用
async fn step(
    session: &ReactSession<'_>,
    tools: &[ToolDefinition],
    conversation: &mut Conversation,
) -> Result<Step, AgentError> {
    let request = GenerateRequest {
        system_instruction: session.system_instruction.to_string(),
        contents: conversation.sanitized(),
        tools: tools.to_vec(),
    };

    session.send_event(ReactEvent::Thinking);
    let response = session.llm.generate(&request).await?;

    if let Some(call) = response.first_call() {
        if response.function_calls.len() > 1 {
            tracing::debug!(
                ignored = response.function_calls.len() - 1,
                "only the first function call is honored"
            );
        }
        return dispatch(session, call.clone(), conversation).await;
    }

    if !response.parts.is_empty() {
        let msg = Message {
            role: Role::Model,
            parts: response.parts,
        };
        session.send_event(ReactEvent::Message { text: msg.text() });
        conversation.push(msg);
    }
    Ok(Step::Finished)
}

async fn dispatch(
    session: &ReactSession<'_>,
    call: FunctionCall,
    conversation: &mut Conversation,
) -> Result<Step, AgentError> {
    if !session.executor.contains(&call.name) {
        tracing::warn!(tool = %call.name, "model requested unknown tool");
        let text = unknown_tool_message(&call.name);
        conversation.push(Message::model(text.clone()));
        session.send_event(ReactEvent::Error { text });
        return Ok(Step::Finished);
    }

    let args = Value::Object(call.args.clone());
    session.send_event(ReactEvent::ToolCall {
        tool: call.name.clone(),
        args: args.clone(),
    });

    tracing::debug!(tool = %call.name, "dispatching tool call");
    let result = session
        .executor
        .execute(&call.name, args)
        .await?
        .into_result_string();

    session.send_event(ReactEvent::Observation {
        tool: call.name.clone(),
        preview: preview(&result),
    });

    let name = call.name.clone();
    conversation.push(Message::function_call(call));
    conversation.push(Message::function_response(name, result));
    Ok(Step::Continue)
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}
