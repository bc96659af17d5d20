//! 站点工具：多页网站落盘与预览链接
//!
//! 站点统一写在 `<root>/generated-site/<folder>/` 下，index.html 为预览入口。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::filesystem::SafeFs;
use crate::tools::schema::{parameters_schema_for, parse_args};
use crate::tools::{Tool, ToolOutput};

pub const GENERATE_SITE_TOOL: &str = "generate_MultiPageWebsite";
pub const PREVIEW_LINK_TOOL: &str = "get_preview_link";

/// 沙箱内存放生成站点的目录
pub const SITE_DIR: &str = "generated-site";
/// 预览入口文件
pub const SITE_ENTRY: &str = "index.html";

/// 站点在沙箱内的相对路径
pub fn site_path(folder: &str) -> String {
    format!("{}/{}", SITE_DIR, folder.trim_matches('/'))
}

/// 预览链接：`<base_url>/generated-site/<folder>/index.html`
pub fn preview_link(base_url: &str, folder: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        site_path(folder),
        SITE_ENTRY
    )
}

#[derive(Deserialize, JsonSchema)]
struct PageArgs {
    /// File path inside the site folder, e.g. index.html or css/style.css
    name: String,
    /// Complete file content
    content: String,
}

#[derive(Deserialize, JsonSchema)]
struct GenerateSiteArgs {
    pages: Vec<PageArgs>,
    /// Folder name under generated-site
    folder: String,
}

#[derive(Deserialize, JsonSchema)]
struct PreviewArgs {
    /// Folder used when generating the site
    folder: String,
}

/// generate_MultiPageWebsite：逐页写入，按需创建中间目录
pub struct GenerateSiteTool {
    fs: SafeFs,
}

impl GenerateSiteTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for GenerateSiteTool {
    fn name(&self) -> &str {
        GENERATE_SITE_TOOL
    }

    fn description(&self) -> &str {
        "Generate multi-page HTML/CSS/JS website."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<GenerateSiteArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: GenerateSiteArgs = parse_args(self.name(), args)?;
        let site = site_path(&args.folder);
        tracing::info!(folder = %args.folder, pages = args.pages.len(), "generate_MultiPageWebsite execute");

        let site_dir = self.fs.resolve(&site).map_err(|e| e.to_string())?;
        std::fs::create_dir_all(&site_dir)
            .map_err(|e| format!("Failed to create {}: {}", site, e))?;

        for page in &args.pages {
            self.fs
                .write_file(&format!("{}/{}", site, page.name), &page.content)
                .map_err(|e| e.to_string())?;
        }

        Ok(ToolOutput::text(format!(
            "🌐 Website created in {} with {} pages.",
            site,
            args.pages.len()
        )))
    }
}

/// get_preview_link：确定性地拼出预览链接，返回结构化结果
pub struct PreviewLinkTool {
    base_url: String,
}

impl PreviewLinkTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Tool for PreviewLinkTool {
    fn name(&self) -> &str {
        PREVIEW_LINK_TOOL
    }

    fn description(&self) -> &str {
        "Get preview link for generated website"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<PreviewArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: PreviewArgs = parse_args(self.name(), args)?;
        let link = preview_link(&self.base_url, &args.folder);
        Ok(ToolOutput::Link {
            message: format!("Preview link for the generated website: {}", link),
            link,
        })
    }
}
