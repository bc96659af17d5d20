//! Headless Agent 运行时
//!
//! 供终端 REPL 与 HTTP API 共用的无界面逻辑：
//! create_agent_components 构建 LLM / ToolExecutor / system instruction，
//! process_messages 对一段对话跑编排循环并返回扩展后的对话。

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{GeminiClient, LlmClient, MockLlmClient};
use crate::memory::{Conversation, Message};
use crate::react::{run, ReactEvent, ReactSession, DEFAULT_SYSTEM_INSTRUCTION};
use crate::tools::{
    AppendFileTool, CreateFileTool, DeleteFileTool, GenerateSiteTool, ListFilesTool,
    PreviewLinkTool, ReadFileTool, SafeFs, ToolExecutor, ToolRegistry,
};

/// 预构建的 Agent 组件，可被多个请求共享（内部无可变状态）
pub struct AgentComponents {
    pub llm: Arc<dyn LlmClient>,
    pub executor: ToolExecutor,
    pub system_instruction: String,
    pub max_rounds: usize,
}

/// 按配置选择 LLM：provider=gemini 且有 GEMINI_API_KEY 时走 Gemini，否则回退到演示用 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());

    match (provider.as_str(), api_key) {
        ("gemini", Some(key)) => match GeminiClient::new(
            cfg.llm.api_base.as_deref(),
            &cfg.llm.model,
            &key,
            cfg.llm.timeouts.request,
        ) {
            Ok(client) => {
                tracing::info!("Using Gemini LLM ({})", cfg.llm.model);
                Arc::new(client)
            }
            Err(e) => {
                tracing::warn!("Gemini client init failed ({}), using Mock LLM", e);
                Arc::new(MockLlmClient::demo())
            }
        },
        ("mock", _) => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient::demo())
        }
        _ => {
            tracing::warn!("No GEMINI_API_KEY set or provider unknown, using Mock LLM");
            Arc::new(MockLlmClient::demo())
        }
    }
}

/// 预览链接前缀：环境变量 BASE_URL > 配置 [app].base_url
pub fn resolve_base_url(cfg: &AppConfig) -> String {
    pick_base_url(std::env::var("BASE_URL").ok(), &cfg.app.base_url)
}

fn pick_base_url(env: Option<String>, configured: &str) -> String {
    env.filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

/// 读取 config/prompts/system.md，不存在时用内置默认
pub fn load_system_instruction() -> String {
    ["config/prompts/system.md", "../config/prompts/system.md"]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string())
}

/// 注册全部七个工具，文件类工具共享同一个沙箱根
pub fn build_registry(workspace: &Path, base_url: &str) -> ToolRegistry {
    let fs = SafeFs::new(workspace);
    let mut tools = ToolRegistry::new();
    tools.register(CreateFileTool::new(fs.clone()));
    tools.register(ReadFileTool::new(fs.clone()));
    tools.register(DeleteFileTool::new(fs.clone()));
    tools.register(AppendFileTool::new(fs.clone()));
    tools.register(ListFilesTool::new(fs.clone()));
    tools.register(GenerateSiteTool::new(fs));
    tools.register(PreviewLinkTool::new(base_url));
    tools
}

/// 创建 Agent 组件：确保沙箱根存在，注册工具并加载 system instruction
pub fn create_agent_components(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<AgentComponents, AgentError> {
    let workspace = &cfg.app.workspace_root;
    std::fs::create_dir_all(workspace)?;

    let base_url = resolve_base_url(cfg);
    let tools = build_registry(workspace, &base_url);
    tracing::info!(
        workspace = %workspace.display(),
        base_url = %base_url,
        tools = tools.len(),
        "agent components ready"
    );

    Ok(AgentComponents {
        llm,
        executor: ToolExecutor::new(tools, cfg.tools.tool_timeout_secs),
        system_instruction: load_system_instruction(),
        max_rounds: cfg.agent.max_rounds,
    })
}

/// 处理一段对话：跑编排循环（无事件流），返回扩展后的对话
pub async fn process_messages(
    components: &AgentComponents,
    messages: Vec<Message>,
) -> Conversation {
    let session = ReactSession::new(
        components.llm.as_ref(),
        &components.executor,
        &components.system_instruction,
    )
    .with_max_rounds(components.max_rounds);
    run(&session, Conversation::from(messages)).await
}

/// 带事件流处理：通过 event_tx 推送 RoundUpdate / ToolCall / Observation / Message / Done
pub async fn process_messages_stream(
    components: &AgentComponents,
    messages: Vec<Message>,
    event_tx: mpsc::UnboundedSender<ReactEvent>,
) -> Conversation {
    let session = ReactSession::new(
        components.llm.as_ref(),
        &components.executor,
        &components.system_instruction,
    )
    .with_max_rounds(components.max_rounds)
    .with_event_tx(&event_tx);
    run(&session, Conversation::from(messages)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(dir: &Path) -> AgentComponents {
        let mut cfg = AppConfig::default();
        cfg.app.workspace_root = dir.join("public");
        create_agent_components(&cfg, Arc::new(MockLlmClient::demo())).unwrap()
    }

    #[test]
    fn test_registers_all_tools() {
        let dir = tempfile::tempdir().unwrap();
        let c = components(dir.path());
        let mut names = c.executor.tool_names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "append_File",
                "create_File",
                "delete_File",
                "generate_MultiPageWebsite",
                "get_preview_link",
                "list_Files",
                "read_File",
            ]
        );
        assert!(dir.path().join("public").is_dir());
        assert_eq!(c.max_rounds, 10);
    }

    #[test]
    fn test_base_url_env_wins() {
        assert_eq!(
            pick_base_url(Some("https://sites.example".into()), "http://localhost:3000"),
            "https://sites.example"
        );
        assert_eq!(
            pick_base_url(Some("  ".into()), "http://localhost:3000"),
            "http://localhost:3000"
        );
        assert_eq!(pick_base_url(None, "http://x"), "http://x");
    }

    #[tokio::test]
    async fn test_demo_exchange_yields_preview_link() {
        let dir = tempfile::tempdir().unwrap();
        let c = components(dir.path());

        let out = process_messages(&c, vec![Message::user("make a one-page site")]).await;
        let link = out.preview_link().unwrap();
        assert!(link.ends_with("/generated-site/demo-site/index.html"));
        assert!(dir
            .path()
            .join("public/generated-site/demo-site/index.html")
            .is_file());
    }

    #[tokio::test]
    async fn test_stream_ends_with_done() {
        let dir = tempfile::tempdir().unwrap();
        let c = components(dir.path());
        let (tx, mut rx) = mpsc::unbounded_channel();

        process_messages_stream(&c, vec![Message::user("hi")], tx).await;
        let mut last = None;
        while let Some(ev) = rx.recv().await {
            last = Some(ev);
        }
        assert_eq!(last, Some(ReactEvent::Done));
    }
}
