//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SITESMITH__*` 覆盖（双下划线表示嵌套，如 `SITESMITH__AGENT__MAX_ROUNDS=5`）。
//! 另外兼容两个裸环境变量：`GEMINI_API_KEY`（见 agent::create_llm_from_config）与 `BASE_URL`（预览链接前缀）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::GEMINI_FLASH;
use crate::react::MAX_RETRIES;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub web: WebSection,
}

/// [app] 段：站点输出目录与预览链接前缀
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 文件工具的沙箱根目录
    pub workspace_root: PathBuf,
    /// 预览链接前缀；环境变量 BASE_URL 优先
    pub base_url: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./public"),
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// [llm] 段：后端选择、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// gemini / mock；gemini 且无 API Key 时回退到 mock
    pub provider: String,
    pub model: String,
    pub api_base: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: GEMINI_FLASH.to_string(),
            api_base: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [agent] 段：单次交换的工具轮数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_rounds: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_rounds: MAX_RETRIES,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
        }
    }
}

/// [web] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub port: u16,
}

impl Default for WebSection {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// 从 config 目录加载配置，环境变量 SITESMITH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SITESMITH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SITESMITH")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.workspace_root, PathBuf::from("./public"));
        assert_eq!(cfg.app.base_url, "http://localhost:3000");
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.model, "gemini-2.5-flash");
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert_eq!(cfg.agent.max_rounds, 10);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.web.port, 3000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[app]\nworkspace_root = \"/tmp/sites\"\n\n[agent]\nmax_rounds = 3\n"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.workspace_root, PathBuf::from("/tmp/sites"));
        assert_eq!(cfg.agent.max_rounds, 3);
        assert_eq!(cfg.app.base_url, "http://localhost:3000");
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let cfg = load_config(Some(PathBuf::from("/nonexistent/sitesmith.toml"))).unwrap();
        assert_eq!(cfg.llm.provider, AppConfig::default().llm.provider);
    }
}
