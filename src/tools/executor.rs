//! 工具执行器：派发边界
//!
//! 持有 ToolRegistry、外层超时与结果上限。dispatch 按名查找处理器（未知工具直接报 Tool 错误），
//! 在超时内执行；任何失败都在这里转成 "Error: ..." 文本，不会中断本轮；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{AgentError, Session};
use crate::memory::ToolCall;
use crate::tools::sandbox::clamp;
use crate::tools::{ToolRegistry, ToolSpec};

/// 一次派发的结果：写回 ToolResult 的文本，以及是否成功
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub ok: bool,
}

pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
    max_result_chars: usize,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64, max_result_chars: usize) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
            max_result_chars,
        }
    }

    /// 执行指定工具；未知工具返回 Tool 错误，超过外层超时返回 Timeout
    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
        session: &mut Session,
    ) -> Result<String, AgentError> {
        let handler = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::tool(format!("Unknown tool: {}", tool_name)))?;
        timeout(self.timeout, handler.execute(args, session))
            .await
            .map_err(|_| {
                AgentError::Timeout(format!("{} exceeded {}s", tool_name, self.timeout.as_secs()))
            })?
    }

    /// 派发一次工具调用并把结果统一为文本（成功与失败文本都按全局上限截断）
    pub async fn dispatch(&self, call: &ToolCall, session: &mut Session) -> ToolOutcome {
        let start = Instant::now();
        let args_preview = args_preview(&call.arguments);
        let result = self.execute(&call.name, call.arguments.clone(), session).await;

        let (ok, outcome) = match &result {
            Ok(_) => (true, "ok"),
            Err(AgentError::Timeout(_)) => (false, "timeout"),
            Err(_) => (false, "error"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "call_id": call.id,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(content) => ToolOutcome {
                content: clamp(&content, self.max_result_chars),
                ok: true,
            },
            Err(e) => ToolOutcome {
                content: clamp(&format!("Error: {}", e), self.max_result_chars),
                ok: false,
            },
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
