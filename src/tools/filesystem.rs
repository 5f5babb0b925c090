//! 沙箱文件工具
//!
//! ReadFileTool / WriteFileTool 的每个路径参数都先经 Sandbox::resolve_path 校验，再访问磁盘。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::core::{AgentError, Session};
use crate::tools::sandbox::clamp;
use crate::tools::{Sandbox, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Path relative to the workspace root
    pub path: String,
    /// First line to return (1-based)
    pub start_line: Option<i64>,
    /// Last line to return (inclusive); negative means end of file
    pub end_line: Option<i64>,
    /// Maximum characters returned (default 100000)
    pub max_chars: Option<usize>,
}

/// 读取工作区内的 UTF-8 文本文件，可按行截取
pub struct ReadFileTool {
    sandbox: Sandbox,
}

impl ReadFileTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

/// 1 起始、含 end；end 缺省或为负表示到文件末尾；end < start 得到空切片
fn slice_lines(text: &str, start_line: Option<i64>, end_line: Option<i64>) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = match start_line {
        Some(n) if n > 0 => (n - 1) as usize,
        _ => 0,
    };
    let end = match end_line {
        Some(n) if n >= 0 => (n as usize).max(start),
        _ => lines.len(),
    };
    let start = start.min(lines.len());
    let end = end.min(lines.len());
    lines[start..end].join("\n")
}

#[async_trait]
impl Tool for ReadFileTool {
    type Args = ReadFileArgs;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file within the workspace. Optional 1-based start_line / inclusive end_line select a range."
    }

    async fn call(&self, args: ReadFileArgs, _session: &mut Session) -> Result<String, AgentError> {
        let resolved = self.sandbox.resolve_path(&args.path)?;
        let text = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| AgentError::tool(format!("read {} failed: {}", args.path, e)))?;
        let slice = slice_lines(&text, args.start_line, args.end_line);
        let max_chars = args.max_chars.unwrap_or(self.sandbox.max_result_chars());
        Ok(clamp(&slice, max_chars))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Path relative to the workspace root; parent directories are created
    pub path: String,
    pub content: String,
    /// overwrite (default) or append
    #[serde(default)]
    pub mode: WriteMode,
}

/// 创建或覆盖（追加）工作区内的 UTF-8 文本文件
pub struct WriteFileTool {
    sandbox: Sandbox,
}

impl WriteFileTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    type Args = WriteFileArgs;

    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a UTF-8 text file in the workspace (mode=append appends to an existing file)."
    }

    async fn call(&self, args: WriteFileArgs, _session: &mut Session) -> Result<String, AgentError> {
        let resolved = self.sandbox.resolve_path(&args.path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if args.mode == WriteMode::Append && resolved.exists() {
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .open(&resolved)
                .await?;
            file.write_all(args.content.as_bytes()).await?;
            file.flush().await?;
        } else {
            tokio::fs::write(&resolved, args.content.as_bytes()).await?;
        }

        Ok(format!(
            "wrote {} bytes to {}",
            args.content.len(),
            self.sandbox.relative(&resolved).display()
        ))
    }
}
