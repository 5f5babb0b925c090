//! TestPilot - 交互式测试生成智能体
//!
//! 入口：初始化日志、加载配置、创建沙箱 / 工具 / 编排器，并运行 REPL。

use std::sync::Arc;

use anyhow::Context;
use testpilot::config::load_config;
use testpilot::core::{Orchestrator, Session};
use testpilot::llm::create_llm_from_config;
use testpilot::react::build_system_prompt;
use testpilot::tools::{build_registry, CommandBackend, Sandbox, ToolExecutor};
use testpilot::ui::console::{banner, info_line};
use testpilot::{observability, ui};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let root = cfg.workspace_root().context("Failed to determine workspace root")?;
    let sandbox = Sandbox::new(&root, cfg.tools.max_tool_result_chars)
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;

    let backend = Arc::new(CommandBackend::new(&cfg.tools.test_gen, sandbox.root()));
    let registry = build_registry(&cfg.tools, &sandbox, backend);
    let executor = ToolExecutor::new(
        registry,
        cfg.tools.tool_timeout_secs,
        cfg.tools.max_tool_result_chars,
    );

    let llm = create_llm_from_config(&cfg.llm);
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(llm, executor, cfg.tools.max_model_calls_per_input)
        .with_event_tx(event_tx)
        .with_heartbeat(true);

    let mut session = Session::new(build_system_prompt(sandbox.root()), &cfg.board);

    let title = cfg.app.name.as_deref().unwrap_or("TestPilot");
    println!(
        "{}",
        banner(title, "AI-Powered Test Case Generation", sandbox.root())
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    ui::run_repl(&orchestrator, &mut session, event_rx, stdin, &mut stdout)
        .await
        .context("REPL failed")?;

    let (prompt, completion, total) = orchestrator.llm().token_usage();
    if total > 0 {
        println!(
            "{}",
            info_line(&format!(
                "Token usage: {} prompt + {} completion = {} total",
                prompt, completion, total
            ))
        );
    }
    Ok(())
}
