//! Bash 工具：在工作区内执行 shell 命令
//!
//! 先经 Sandbox::filter_command 黑名单拦截（拦截发生在进程创建之前），再通过 sh -c / cmd /C 执行，
//! cwd 固定为工作区根目录，子进程单独成组；超时后杀掉整个进程组并返回 Timeout。

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::process::Command;

use crate::core::{AgentError, Session};
use crate::tools::process::{isolate_process_group, kill_process_group};
use crate::tools::{Sandbox, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BashArgs {
    /// The shell command to execute inside the workspace
    #[serde(default)]
    pub command: String,
    /// Timeout in milliseconds (default 30000)
    pub timeout_ms: Option<u64>,
}

pub struct BashTool {
    sandbox: Sandbox,
    default_timeout_ms: u64,
}

impl BashTool {
    pub fn new(sandbox: Sandbox, default_timeout_ms: u64) -> Self {
        Self {
            sandbox,
            default_timeout_ms,
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    type Args = BashArgs;

    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command inside the project workspace. Output (stdout and stderr) is returned as text."
    }

    async fn call(&self, args: BashArgs, _session: &mut Session) -> Result<String, AgentError> {
        let command = args.command.trim();
        if command.is_empty() {
            return Err(AgentError::tool("missing bash.command"));
        }
        self.sandbox.filter_command(command)?;

        let timeout_ms = args.timeout_ms.unwrap_or(self.default_timeout_ms);
        tracing::info!(command = %command, timeout_ms, "bash tool execute");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(self.sandbox.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let child = cmd
            .spawn()
            .map_err(|e| AgentError::tool(format!("failed to spawn shell: {}", e)))?;
        let pid = child.id();
        let output = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => {
                result.map_err(|e| AgentError::tool(format!("failed to wait for shell: {}", e)))?
            }
            Err(_) => {
                kill_process_group(pid);
                return Err(AgentError::Timeout(format!(
                    "bash command exceeded {}ms",
                    timeout_ms
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut text = [stdout.as_ref(), stderr.as_ref()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if text.is_empty() {
            text = "(no output)".to_string();
        }
        if !output.status.success() {
            match output.status.code() {
                Some(code) => text.push_str(&format!("\n[exit status {}]", code)),
                None => text.push_str("\n[terminated by signal]"),
            }
        }
        Ok(self.sandbox.clamp_result(&text))
    }
}
