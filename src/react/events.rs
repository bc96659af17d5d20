//! 编排过程事件：用于终端/前端展示轮次、工具调用、观察与回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 轮次更新（当前第几轮）
    RoundUpdate { round: usize, max_rounds: usize },
    /// 正在调用模型
    Thinking,
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 模型的最终文本回复
    Message { text: String },
    /// 诊断（未知工具 / 轮数耗尽 / 内部错误）
    Error { text: String },
    /// 本次交换结束
    Done,
}
