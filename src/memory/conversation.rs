//! 对话模型：单次交换内的有序消息日志
//!
//! 消息只追加、不修改；整段日志归本次请求所有，交换结束即丢弃（不跨请求持久化）。
//! JSON 形状与模型 API 一致：`{"role": "user", "parts": [{"text": "..."}]}`。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::site::PREVIEW_LINK_TOOL;

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// 模型发起的工具调用：工具名 + 参数映射
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }
}

/// 工具结果（始终为单个字符串）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub result: String,
}

/// 回传给模型的工具结果，按工具名标记
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: FunctionResult,
}

/// 消息中的单个内容单元：文本 / 工具调用 / 工具结果，三者取一
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Part::FunctionCall { function_call } => Some(function_call),
            _ => None,
        }
    }

    pub fn as_function_response(&self) -> Option<&FunctionResponse> {
        match self {
            Part::FunctionResponse { function_response } => Some(function_response),
            _ => None,
        }
    }
}

/// 单条消息；parts 为空的消息视为无效，发送给模型前会被过滤
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// 模型消息，唯一的 part 是回显的工具调用
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::FunctionCall {
                function_call: call,
            }],
        }
    }

    /// user 角色消息，唯一的 part 是工具结果
    pub fn function_response(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse {
                function_response: FunctionResponse {
                    name: name.into(),
                    response: FunctionResult {
                        result: result.into(),
                    },
                },
            }],
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.parts.is_empty()
    }

    /// 拼接所有文本 part
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 一次交换的完整消息序列；顺序有意义，每轮都会把完整前缀发给模型
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// 只保留 parts 非空的消息（幂等，畸形消息静默丢弃）
    pub fn sanitized(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.is_valid())
            .cloned()
            .collect()
    }

    /// 扫描 get_preview_link 的工具结果，解析其中的 link 字段；有多个时取最后一个
    pub fn preview_link(&self) -> Option<String> {
        self.preview_link_since(0)
    }

    /// 同 preview_link，但只看下标 start 之后追加的消息（多轮会话中只取本轮的链接）
    pub fn preview_link_since(&self, start: usize) -> Option<String> {
        self.messages
            .get(start..)
            .unwrap_or_default()
            .iter()
            .flat_map(|m| m.parts.iter())
            .filter_map(Part::as_function_response)
            .filter(|r| r.name == PREVIEW_LINK_TOOL)
            .filter_map(|r| serde_json::from_str::<Value>(&r.response.result).ok())
            .filter_map(|v| v.get("link").and_then(Value::as_str).map(String::from))
            .filter(|link| !link.is_empty())
            .last()
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
