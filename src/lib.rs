//! Sitesmith - 工具调用驱动的网站生成智能体
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（供终端 REPL 与 HTTP API 调用）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **llm**: LLM 客户端抽象与实现（Gemini / Mock）
//! - **memory**: 对话模型（Message / Part / Conversation）
//! - **observability**: 日志初始化
//! - **react**: 工具调用编排主循环与过程事件
//! - **tools**: 文件与站点工具、注册表、执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
