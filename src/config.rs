//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TESTPILOT__*` 覆盖（双下划线表示嵌套，如 `TESTPILOT__TOOLS__MAX_TOOL_RESULT_CHARS=5000`）。
//! 进程启动时读一次，会话内不可变。

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::TaskStatus;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub board: BoardSection,
}

/// [app] 段：应用名、工作目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 沙箱根目录，未设置时用当前目录
    pub workspace_root: Option<PathBuf>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// openai（任意 OpenAI 兼容端点）/ mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 保存 API Key 的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            max_tokens: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// [tools] 段：结果截断、超时、单次输入的模型调用上限
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_max_tool_result_chars")]
    pub max_tool_result_chars: usize,
    /// 单次工具调用的外层超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// bash 未给 timeout_ms 时的默认值
    #[serde(default = "default_bash_timeout_ms")]
    pub bash_default_timeout_ms: u64,
    #[serde(default = "default_max_model_calls")]
    pub max_model_calls_per_input: usize,
    #[serde(default)]
    pub test_gen: TestGenSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            max_tool_result_chars: default_max_tool_result_chars(),
            tool_timeout_secs: default_tool_timeout_secs(),
            bash_default_timeout_ms: default_bash_timeout_ms(),
            max_model_calls_per_input: default_max_model_calls(),
            test_gen: TestGenSection::default(),
        }
    }
}

fn default_max_tool_result_chars() -> usize {
    100_000
}

fn default_tool_timeout_secs() -> u64 {
    600
}

fn default_bash_timeout_ms() -> u64 {
    30_000
}

fn default_max_model_calls() -> usize {
    50
}

/// [tools.test_gen] 段：测试生成库的外部程序（未配置时相关工具返回错误）
#[derive(Debug, Clone, Deserialize)]
pub struct TestGenSection {
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_test_gen_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TestGenSection {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: default_test_gen_timeout_secs(),
        }
    }
}

fn default_test_gen_timeout_secs() -> u64 {
    300
}

/// [board] 段：允许的任务状态与看板容量
#[derive(Debug, Clone, Deserialize)]
pub struct BoardSection {
    #[serde(default = "default_allowed_statuses")]
    pub allowed_statuses: Vec<TaskStatus>,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            allowed_statuses: default_allowed_statuses(),
            max_items: default_max_items(),
        }
    }
}

fn default_allowed_statuses() -> Vec<TaskStatus> {
    vec![
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ]
}

fn default_max_items() -> usize {
    20
}

impl AppConfig {
    /// 沙箱根：配置 > 当前目录
    pub fn workspace_root(&self) -> std::io::Result<PathBuf> {
        match &self.app.workspace_root {
            Some(p) => Ok(p.clone()),
            None => std::env::current_dir(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 TESTPILOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TESTPILOT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if Path::new(&path).exists() {
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
        config::Environment::with_prefix("TESTPILOT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 读取 system prompt 模板（config/prompts/system.txt），未找到时返回 None
pub fn load_prompt_template() -> Option<String> {
    ["config/prompts/system.txt", "../config/prompts/system.txt"]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.tools.max_tool_result_chars, 100_000);
        assert_eq!(cfg.tools.bash_default_timeout_ms, 30_000);
        assert_eq!(cfg.board.max_items, 20);
        assert_eq!(cfg.board.allowed_statuses.len(), 3);
        assert!(cfg.tools.test_gen.program.is_none());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[tools]
max_tool_result_chars = 500

[board]
allowed_statuses = ["pending", "completed"]
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.tools.max_tool_result_chars, 500);
        assert_eq!(
            cfg.board.allowed_statuses,
            vec![TaskStatus::Pending, TaskStatus::Completed]
        );
        // 未设置的键保持默认
        assert_eq!(cfg.tools.max_model_calls_per_input, 50);
    }
}
