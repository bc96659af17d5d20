//! 记忆层：单次交换内的对话日志（不跨请求持久化）

pub mod conversation;

pub use conversation::{Conversation, FunctionCall, FunctionResponse, FunctionResult, Message, Part, Role};
