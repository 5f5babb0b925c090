//! 测试用例生成工具
//!
//! 七个领域操作（initialize … export_cases）对编排器是黑盒：参数原样交给 TestGenBackend，
//! 返回文本与可选的产物。产物由这里经 Sandbox 写入工作区，结果中逐条列出 `saved <path>`。

use std::marker::PhantomData;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::TestGenSection;
use crate::core::{AgentError, Session};
use crate::tools::process::{isolate_process_group, kill_process_group};
use crate::tools::{Sandbox, Tool, ToolRegistry};

/// 领域操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestGenOp {
    Initialize,
    ExtractCovered,
    ExecuteStrategies,
    InferOutputs,
    ApplyOutputs,
    GetResults,
    ExportCases,
}

impl TestGenOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestGenOp::Initialize => "initialize",
            TestGenOp::ExtractCovered => "extract_covered",
            TestGenOp::ExecuteStrategies => "execute_strategies",
            TestGenOp::InferOutputs => "infer_outputs",
            TestGenOp::ApplyOutputs => "apply_outputs",
            TestGenOp::GetResults => "get_results",
            TestGenOp::ExportCases => "export_cases",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            TestGenOp::Initialize => {
                "Initialize the test case generator with a function definition given as a JSON string."
            }
            TestGenOp::ExtractCovered => {
                "Extract the test combinations already covered by existing test cases."
            }
            TestGenOp::ExecuteStrategies => {
                "Generate new test combinations using the coverage strategies (outputs left empty)."
            }
            TestGenOp::InferOutputs => {
                "Infer expected outputs for the generated combinations. Returns a JSON array of results."
            }
            TestGenOp::ApplyOutputs => {
                "Apply inferred outputs (the JSON array returned by infer_outputs) to the generated combinations."
            }
            TestGenOp::GetResults => {
                "Summarize the generated combinations and save them to the workspace."
            }
            TestGenOp::ExportCases => {
                "Export the generated test cases to the workspace (output_format: json or markdown)."
            }
        }
    }
}

/// 后端产物：相对工作区的路径与内容（字符串原样写入，其余按 JSON 美化写入）
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub content: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendReply {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl BackendReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            artifacts: Vec::new(),
        }
    }
}

/// 测试生成库的调用边界
#[async_trait]
pub trait TestGenBackend: Send + Sync {
    async fn invoke(&self, op: TestGenOp, args: Value) -> Result<BackendReply, AgentError>;
}

/// 通过外部程序实现的后端：`program args.. <op>`，JSON 参数经 stdin 传入，cwd 为工作区
pub struct CommandBackend {
    program: Option<String>,
    args: Vec<String>,
    workspace: PathBuf,
    timeout_secs: u64,
}

impl CommandBackend {
    pub fn new(section: &TestGenSection, workspace: impl Into<PathBuf>) -> Self {
        Self {
            program: section.program.clone().filter(|p| !p.trim().is_empty()),
            args: section.args.clone(),
            workspace: workspace.into(),
            timeout_secs: section.timeout_secs,
        }
    }
}

#[async_trait]
impl TestGenBackend for CommandBackend {
    async fn invoke(&self, op: TestGenOp, args: Value) -> Result<BackendReply, AgentError> {
        let program = self.program.as_deref().ok_or_else(|| {
            AgentError::tool(
                "test generation backend is not configured (set [tools.test_gen] program)",
            )
        })?;
        tracing::info!(program = %program, op = op.as_str(), "test_gen backend invoke");

        let mut command = Command::new(program);
        command
            .args(&self.args)
            .arg(op.as_str())
            .current_dir(&self.workspace)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut command);
        let mut child = command
            .spawn()
            .map_err(|e| AgentError::tool(format!("test_gen spawn failed: {}", e)))?;
        let pid = child.id();

        // 写 stdin 与读 stdout/stderr 并发进行，整体受同一个超时约束
        let stdin = child.stdin.take();
        let payload = args.to_string();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // 子进程可能不读 stdin 就退出
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::debug!(error = %e, "test_gen stdin closed early");
                }
            }
        };
        let run = async move {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), run).await
        {
            Ok(result) => {
                result.map_err(|e| AgentError::tool(format!("test_gen wait failed: {}", e)))?
            }
            Err(_) => {
                kill_process_group(pid);
                return Err(AgentError::Timeout(format!(
                    "test_gen {} exceeded {}s",
                    op.as_str(),
                    self.timeout_secs
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::tool(format!(
                "test_gen {} exit {:?}: {}",
                op.as_str(),
                output.status.code(),
                stderr.trim()
            )));
        }
        Ok(parse_reply(stdout))
    }
}

/// 含 text 或 artifacts 字段的 JSON 对象视为结构化回复，其余（包括其它 JSON）原样作为文本
fn parse_reply(stdout: String) -> BackendReply {
    let structured = serde_json::from_str::<Value>(&stdout)
        .ok()
        .filter(|v| v.get("text").is_some() || v.get("artifacts").is_some())
        .and_then(|v| serde_json::from_value::<BackendReply>(v).ok());
    structured.unwrap_or_else(|| BackendReply::text(stdout))
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InitializeArgs {
    /// Function definition as a JSON string
    pub json_data: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApplyOutputsArgs {
    /// JSON array returned by infer_outputs
    pub inferred_results: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExportArgs {
    /// json (default) or markdown
    #[serde(default)]
    pub output_format: ExportFormat,
}

/// 单个领域操作的工具；A 为该操作的参数类型
pub struct TestGenTool<A> {
    op: TestGenOp,
    backend: Arc<dyn TestGenBackend>,
    sandbox: Sandbox,
    _args: PhantomData<fn() -> A>,
}

impl<A> TestGenTool<A> {
    pub fn new(op: TestGenOp, backend: Arc<dyn TestGenBackend>, sandbox: Sandbox) -> Self {
        Self {
            op,
            backend,
            sandbox,
            _args: PhantomData,
        }
    }

    async fn save_artifact(&self, artifact: &Artifact) -> Result<String, AgentError> {
        let resolved = self.sandbox.resolve_path(&artifact.path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = match &artifact.content {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other)
                .map_err(|e| AgentError::tool(format!("artifact encode failed: {}", e)))?,
        };
        tokio::fs::write(&resolved, body.as_bytes()).await?;
        Ok(self.sandbox.relative(&resolved).display().to_string())
    }
}

#[async_trait]
impl<A> Tool for TestGenTool<A>
where
    A: DeserializeOwned + Serialize + JsonSchema + Send + 'static,
{
    type Args = A;

    fn name(&self) -> &str {
        self.op.as_str()
    }

    fn description(&self) -> &str {
        self.op.description()
    }

    async fn call(&self, args: A, _session: &mut Session) -> Result<String, AgentError> {
        let payload = serde_json::to_value(&args)
            .map_err(|e| AgentError::tool(format!("encode {} args: {}", self.op.as_str(), e)))?;
        let reply = self.backend.invoke(self.op, payload).await?;

        let mut lines = Vec::with_capacity(reply.artifacts.len() + 1);
        if !reply.text.is_empty() {
            lines.push(reply.text.clone());
        }
        for artifact in &reply.artifacts {
            let rel = self.save_artifact(artifact).await?;
            lines.push(format!("saved {}", rel));
        }
        if lines.is_empty() {
            lines.push("(no output)".to_string());
        }
        Ok(lines.join("\n"))
    }
}

/// 注册全部七个领域工具
pub fn register_test_gen_tools(
    registry: &mut ToolRegistry,
    backend: Arc<dyn TestGenBackend>,
    sandbox: &Sandbox,
) {
    registry.register(TestGenTool::<InitializeArgs>::new(
        TestGenOp::Initialize,
        backend.clone(),
        sandbox.clone(),
    ));
    for op in [
        TestGenOp::ExtractCovered,
        TestGenOp::ExecuteStrategies,
        TestGenOp::InferOutputs,
    ] {
        registry.register(TestGenTool::<NoArgs>::new(op, backend.clone(), sandbox.clone()));
    }
    registry.register(TestGenTool::<ApplyOutputsArgs>::new(
        TestGenOp::ApplyOutputs,
        backend.clone(),
        sandbox.clone(),
    ));
    registry.register(TestGenTool::<NoArgs>::new(
        TestGenOp::GetResults,
        backend.clone(),
        sandbox.clone(),
    ));
    registry.register(TestGenTool::<ExportArgs>::new(
        TestGenOp::ExportCases,
        backend,
        sandbox.clone(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(TestGenOp, Value)>>,
    }

    #[async_trait]
    impl TestGenBackend for RecordingBackend {
        async fn invoke(&self, op: TestGenOp, args: Value) -> Result<BackendReply, AgentError> {
            self.calls.lock().unwrap().push((op, args));
            Ok(BackendReply {
                text: format!("{} ok", op.as_str()),
                artifacts: vec![Artifact {
                    path: "generated_test_cases.json".into(),
                    content: serde_json::json!({"cases": [1, 2]}),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_artifacts_are_written_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path(), 1000).unwrap();
        let backend = Arc::new(RecordingBackend::default());
        let tool = TestGenTool::<ExportArgs>::new(TestGenOp::ExportCases, backend.clone(), sandbox);

        let mut session = Session::default();
        let out = tool
            .call(ExportArgs { output_format: ExportFormat::Json }, &mut session)
            .await
            .unwrap();
        assert_eq!(out, "export_cases ok\nsaved generated_test_cases.json");

        let saved: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("generated_test_cases.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["cases"][1], 2);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].0, TestGenOp::ExportCases);
        assert_eq!(calls[0].1["output_format"], "json");
    }

    struct EscapingBackend;

    #[async_trait]
    impl TestGenBackend for EscapingBackend {
        async fn invoke(&self, _op: TestGenOp, _args: Value) -> Result<BackendReply, AgentError> {
            Ok(BackendReply {
                text: String::new(),
                artifacts: vec![Artifact {
                    path: "../outside.json".into(),
                    content: Value::Null,
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_artifact_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path().join("ws"), 1000).unwrap();
        let tool = TestGenTool::<NoArgs>::new(TestGenOp::GetResults, Arc::new(EscapingBackend), sandbox);
        let mut session = Session::default();
        let err = tool.call(NoArgs {}, &mut session).await.unwrap_err();
        assert!(matches!(err, AgentError::PathEscape(_)));
        assert!(!dir.path().join("outside.json").exists());
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_tool_error() {
        let backend = CommandBackend::new(&TestGenSection::default(), ".");
        let err = backend.invoke(TestGenOp::Initialize, Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::Tool(ref m) if m.contains("not configured")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_backend_plain_and_structured() {
        let dir = tempfile::tempdir().unwrap();
        let plain = CommandBackend::new(
            &TestGenSection {
                program: Some("echo".into()),
                args: vec!["ran".into()],
                timeout_secs: 10,
            },
            dir.path(),
        );
        let reply = plain.invoke(TestGenOp::GetResults, Value::Null).await.unwrap();
        assert_eq!(reply, BackendReply::text("ran get_results"));

        let structured = CommandBackend::new(
            &TestGenSection {
                program: Some("sh".into()),
                args: vec![
                    "-c".into(),
                    r#"cat >/dev/null; printf '{"text":"op %s","artifacts":[]}' "$0""#.into(),
                ],
                timeout_secs: 10,
            },
            dir.path(),
        );
        let reply = structured
            .invoke(TestGenOp::Initialize, serde_json::json!({"json_data": "{}"}))
            .await
            .unwrap();
        assert_eq!(reply.text, "op initialize");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_backend_timeout_covers_stdin_write() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CommandBackend::new(
            &TestGenSection {
                program: Some("sh".into()),
                args: vec!["-c".into(), "sleep 30".into()],
                timeout_secs: 1,
            },
            dir.path(),
        );
        let payload = serde_json::json!({"inferred_results": "x".repeat(1 << 20)});

        let started = std::time::Instant::now();
        let err = backend
            .invoke(TestGenOp::ApplyOutputs, payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_backend_output_before_reading_stdin() {
        let dir = tempfile::tempdir().unwrap();
        // 先写满 stdout 管道再读 stdin
        let backend = CommandBackend::new(
            &TestGenSection {
                program: Some("sh".into()),
                args: vec!["-c".into(), "yes | head -c 300000; cat >/dev/null".into()],
                timeout_secs: 10,
            },
            dir.path(),
        );
        let payload = serde_json::json!({"inferred_results": "x".repeat(1 << 20)});

        let reply = backend.invoke(TestGenOp::ApplyOutputs, payload).await.unwrap();
        assert!(reply.text.starts_with("y\ny\n"));
        assert!(reply.text.len() > 290_000);
    }

    #[test]
    fn test_parse_reply_keeps_domain_json_as_text() {
        let raw = r#"{"status":"success","covered_count":3}"#.to_string();
        assert_eq!(parse_reply(raw.clone()), BackendReply::text(raw));

        let reply = parse_reply(r#"{"artifacts":[{"path":"r.json","content":[1]}]}"#.into());
        assert_eq!(reply.text, "");
        assert_eq!(reply.artifacts[0].path, "r.json");
    }

    #[test]
    fn test_register_all_ops() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path(), 1000).unwrap();
        let mut registry = ToolRegistry::new();
        register_test_gen_tools(&mut registry, Arc::new(RecordingBackend::default()), &sandbox);
        assert_eq!(
            registry.tool_names(),
            vec![
                "initialize",
                "extract_covered",
                "execute_strategies",
                "infer_outputs",
                "apply_outputs",
                "get_results",
                "export_cases"
            ]
        );
    }
}
