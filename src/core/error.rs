//! Agent 错误类型
//!
//! 沙箱 / 看板校验 / 工具错误在派发边界转为 ToolResult 文本；Transport 与 StepLimit 逃逸到 REPL 外层循环。

use thiserror::Error;

use crate::llm::LlmError;

/// 单个会话内可能出现的错误（路径逃逸、命令拦截、看板校验、超时、工具失败、模型传输）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Path escapes workspace: {0}")]
    PathEscape(String),

    #[error("Blocked dangerous command: {0}")]
    BlockedCommand(String),

    #[error("Invalid todo update: {0}")]
    TaskValidation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Model call failed: {0}")]
    Transport(#[from] LlmError),

    /// 单次用户输入内模型调用次数超过上限
    #[error("Exceeded {0} model calls for a single input")]
    StepLimit(usize),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }
}
