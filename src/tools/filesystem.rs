//! 沙箱文件系统工具
//!
//! SafeFs 绑定 root_dir，所有路径经 resolve 校验必须落在 root 下（禁止绝对路径与 ../ 逃逸）；
//! create_File / read_File / delete_File / append_File / list_Files 基于 SafeFs。
//! 文件不存在不是错误：read / append / delete 返回 not-found 标记文本。

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::schema::{parameters_schema_for, parse_args};
use crate::tools::{Tool, ToolOutput};

pub const CREATE_FILE_TOOL: &str = "create_File";
pub const READ_FILE_TOOL: &str = "read_File";
pub const DELETE_FILE_TOOL: &str = "delete_File";
pub const APPEND_FILE_TOOL: &str = "append_File";
pub const LIST_FILES_TOOL: &str = "list_Files";

/// 文件不存在时返回的标记文本
pub fn not_found(file_name: &str) -> String {
    format!("❌ {} not found", file_name)
}

/// 沙箱文件系统：绑定根目录，resolve 做词法校验，防止路径逃逸
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 将相对路径解析到沙箱内；目标可以尚不存在（create 场景）
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AgentError> {
        let trimmed = path.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(AgentError::ToolExecutionFailed("Empty path".to_string()));
        }
        let relative = Path::new(trimmed);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AgentError::PathEscape(path.to_string())); // 如 ../../etc/passwd 或 /etc/passwd
        }
        Ok(self.root_dir.join(relative))
    }

    /// 写文件（覆盖），按需创建父目录
    pub fn write_file(&self, path: &str, content: &str) -> Result<PathBuf, AgentError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&resolved, content)?;
        Ok(resolved)
    }

    /// 读文件；不存在时返回 None
    pub fn read_file(&self, path: &str) -> Result<Option<String>, AgentError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&resolved)?))
    }

    /// 删除文件；不存在时返回 false
    pub fn delete_file(&self, path: &str) -> Result<bool, AgentError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&resolved)?;
        Ok(true)
    }

    /// 追加内容；文件不存在时不创建，返回 false
    pub fn append_file(&self, path: &str, content: &str) -> Result<bool, AgentError> {
        let resolved = self.resolve(path)?;
        if !resolved.is_file() {
            return Ok(false);
        }
        let mut file = std::fs::OpenOptions::new().append(true).open(&resolved)?;
        file.write_all(content.as_bytes())?;
        Ok(true)
    }

    /// 列出根目录下的直接子项（排序，跳过隐藏项，目录带 / 后缀）
    pub fn list_root(&self) -> Result<Vec<String>, AgentError> {
        let mut entries = Vec::new();
        for e in std::fs::read_dir(&self.root_dir)? {
            let e = e?;
            let name = e.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                let ty = if e.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    "/"
                } else {
                    ""
                };
                entries.push(format!("{}{}", name, ty));
            }
        }
        entries.sort();
        Ok(entries)
    }
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct FileContentArgs {
    file_name: String,
    content: String,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct FileNameArgs {
    file_name: String,
}

/// create_File：写入文件（已存在则覆盖）
pub struct CreateFileTool {
    fs: SafeFs,
}

impl CreateFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        CREATE_FILE_TOOL
    }

    fn description(&self) -> &str {
        "Create file with content"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<FileContentArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: FileContentArgs = parse_args(self.name(), args)?;
        tracing::info!(file = %args.file_name, "create_File execute");
        self.fs
            .write_file(&args.file_name, &args.content)
            .map_err(|e| e.to_string())?;
        Ok(ToolOutput::text(format!("✅ Created {}", args.file_name)))
    }
}

/// read_File：返回文件内容或 not-found 标记
pub struct ReadFileTool {
    fs: SafeFs,
}

impl ReadFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        READ_FILE_TOOL
    }

    fn description(&self) -> &str {
        "Read a file"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<FileNameArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: FileNameArgs = parse_args(self.name(), args)?;
        tracing::info!(file = %args.file_name, "read_File execute");
        let content = self.fs.read_file(&args.file_name).map_err(|e| e.to_string())?;
        Ok(ToolOutput::Text(
            content.unwrap_or_else(|| not_found(&args.file_name)),
        ))
    }
}

/// delete_File
pub struct DeleteFileTool {
    fs: SafeFs,
}

impl DeleteFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        DELETE_FILE_TOOL
    }

    fn description(&self) -> &str {
        "Delete a file"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<FileNameArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: FileNameArgs = parse_args(self.name(), args)?;
        tracing::info!(file = %args.file_name, "delete_File execute");
        let deleted = self.fs.delete_file(&args.file_name).map_err(|e| e.to_string())?;
        Ok(ToolOutput::Text(if deleted {
            format!("🗑️ {} deleted", args.file_name)
        } else {
            not_found(&args.file_name)
        }))
    }
}

/// append_File：只对已存在的文件追加
pub struct AppendFileTool {
    fs: SafeFs,
}

impl AppendFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for AppendFileTool {
    fn name(&self) -> &str {
        APPEND_FILE_TOOL
    }

    fn description(&self) -> &str {
        "Append content to file"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<FileContentArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: FileContentArgs = parse_args(self.name(), args)?;
        tracing::info!(file = %args.file_name, "append_File execute");
        let appended = self
            .fs
            .append_file(&args.file_name, &args.content)
            .map_err(|e| e.to_string())?;
        Ok(ToolOutput::Text(if appended {
            format!("➕ Appended to {}", args.file_name)
        } else {
            not_found(&args.file_name)
        }))
    }
}

/// list_Files：列出沙箱根目录
pub struct ListFilesTool {
    fs: SafeFs,
}

impl ListFilesTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        LIST_FILES_TOOL
    }

    fn description(&self) -> &str {
        "List all files"
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, String> {
        tracing::info!("list_Files execute");
        let entries = self.fs.list_root().map_err(|e| e.to_string())?;
        Ok(ToolOutput::Text(entries.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sandbox() -> (tempfile::TempDir, SafeFs) {
        let dir = tempfile::tempdir().unwrap();
        let fs = SafeFs::new(dir.path());
        (dir, fs)
    }

    fn text(out: ToolOutput) -> String {
        out.into_result_string()
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (_dir, fs) = sandbox();
        let created = CreateFileTool::new(fs.clone())
            .execute(json!({"fileName": "a.txt", "content": "x"}))
            .await
            .unwrap();
        assert_eq!(text(created), "✅ Created a.txt");

        let read = ReadFileTool::new(fs)
            .execute(json!({"fileName": "a.txt"}))
            .await
            .unwrap();
        assert_eq!(text(read), "x");
    }

    #[tokio::test]
    async fn test_create_overwrites() {
        let (dir, fs) = sandbox();
        let tool = CreateFileTool::new(fs);
        tool.execute(json!({"fileName": "a.txt", "content": "old"})).await.unwrap();
        tool.execute(json!({"fileName": "a.txt", "content": "new"})).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_read_missing_returns_marker() {
        let (_dir, fs) = sandbox();
        let out = ReadFileTool::new(fs)
            .execute(json!({"fileName": "missing.txt"}))
            .await
            .unwrap();
        assert_eq!(text(out), not_found("missing.txt"));
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let (dir, fs) = sandbox();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        let tool = DeleteFileTool::new(fs);

        let out = tool.execute(json!({"fileName": "b.txt"})).await.unwrap();
        assert_eq!(text(out), "🗑️ b.txt deleted");
        assert!(!dir.path().join("b.txt").exists());

        let out = tool.execute(json!({"fileName": "b.txt"})).await.unwrap();
        assert!(text(out).contains("not found"));
    }

    #[tokio::test]
    async fn test_append_missing_does_not_create() {
        let (dir, fs) = sandbox();
        let out = AppendFileTool::new(fs)
            .execute(json!({"fileName": "log.txt", "content": "more"}))
            .await
            .unwrap();
        assert_eq!(text(out), not_found("log.txt"));
        assert!(!dir.path().join("log.txt").exists());
    }

    #[tokio::test]
    async fn test_append_existing() {
        let (dir, fs) = sandbox();
        std::fs::write(dir.path().join("log.txt"), "one").unwrap();
        let out = AppendFileTool::new(fs)
            .execute(json!({"fileName": "log.txt", "content": "two"}))
            .await
            .unwrap();
        assert_eq!(text(out), "➕ Appended to log.txt");
        assert_eq!(std::fs::read_to_string(dir.path().join("log.txt")).unwrap(), "onetwo");
    }

    #[tokio::test]
    async fn test_list_root_entries() {
        let (dir, fs) = sandbox();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(dir.path().join("generated-site")).unwrap();
        let out = ListFilesTool::new(fs).execute(json!({})).await.unwrap();
        assert_eq!(text(out), "a.txt, b.txt, generated-site/");
    }

    #[tokio::test]
    async fn test_missing_argument_is_error() {
        let (_dir, fs) = sandbox();
        let err = CreateFileTool::new(fs)
            .execute(json!({"fileName": "a.txt"}))
            .await
            .unwrap_err();
        assert!(err.contains("create_File"));
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let (_dir, fs) = sandbox();
        assert!(fs.resolve("a.txt").is_ok());
        assert!(fs.resolve("./nested/a.txt").is_ok());
        assert!(matches!(
            fs.resolve("../../etc/passwd"),
            Err(AgentError::PathEscape(_))
        ));
        assert!(matches!(
            fs.resolve("nested/../../x"),
            Err(AgentError::PathEscape(_))
        ));
        assert!(matches!(fs.resolve("/etc/passwd"), Err(AgentError::PathEscape(_))));
        assert!(fs.resolve("  ").is_err());
    }

    #[test]
    fn test_file_schema_uses_wire_names() {
        let schema = parameters_schema_for::<FileContentArgs>();
        assert!(schema["properties"].get("fileName").is_some());
        assert!(schema["properties"].get("content").is_some());
    }
}
