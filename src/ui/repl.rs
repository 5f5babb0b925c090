//! 交互式读取-执行循环
//!
//! 每次读取一行输入：空行、q / quit / exit（不区分大小写）、输入结束或 Ctrl-C 结束会话；
//! 单次输入处理中的任何错误都打印出来，然后继续读取下一行。中断只在读输入处生效。

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::core::{AgentError, Orchestrator, Session, TurnOutcome};
use crate::react::TurnEvent;
use crate::ui::console::{info_line, prompt_label, render_event};

pub fn is_exit_command(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || matches!(trimmed.to_lowercase().as_str(), "q" | "quit" | "exit")
}

fn write_event<W: Write>(out: &mut W, event: &TurnEvent) -> std::io::Result<()> {
    if let Some(text) = render_event(event) {
        writeln!(out, "{}", text)?;
        out.flush()?;
    }
    Ok(())
}

/// 驱动一次输入；编排器让出执行权时把已发布的事件打印出来，结束后清空剩余事件
async fn drive_turn<W: Write>(
    orchestrator: &Orchestrator,
    session: &mut Session,
    events: &mut UnboundedReceiver<TurnEvent>,
    line: &str,
    out: &mut W,
) -> Result<TurnOutcome, AgentError> {
    let submit = orchestrator.submit(session, line);
    tokio::pin!(submit);
    let result = loop {
        tokio::select! {
            biased;
            res = &mut submit => break res,
            Some(event) = events.recv() => write_event(out, &event)?,
        }
    };
    while let Ok(event) = events.try_recv() {
        write_event(out, &event)?;
    }
    result
}

/// 运行 REPL 直到用户退出；返回处理过的输入条数
pub async fn run_repl<R, W>(
    orchestrator: &Orchestrator,
    session: &mut Session,
    mut events: UnboundedReceiver<TurnEvent>,
    input: R,
    out: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut handled = 0usize;
    loop {
        write!(out, "{}", prompt_label())?;
        out.flush()?;

        let line = tokio::select! {
            read = lines.next_line() => match read? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        if is_exit_command(&line) {
            break;
        }

        writeln!(out)?;
        handled += 1;
        if let Err(e) = drive_turn(orchestrator, session, &mut events, &line, out).await {
            tracing::warn!(error = %e, "turn failed");
            writeln!(out, "{}", info_line(&format!("Error: {}", e)))?;
        }
        writeln!(out)?;
    }
    writeln!(out)?;
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::memory::Message;
    use crate::tools::{ToolExecutor, ToolRegistry};

    #[test]
    fn test_exit_commands() {
        for line in ["", "   ", "q", "QUIT", " Exit "] {
            assert!(is_exit_command(line), "{line:?}");
        }
        assert!(!is_exit_command("quit please"));
    }

    fn orchestrator(llm: Arc<ScriptedLlmClient>) -> (Orchestrator, UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let executor = ToolExecutor::new(ToolRegistry::new(), 5, 1000);
        (Orchestrator::new(llm, executor, 10).with_event_tx(tx), rx)
    }

    #[tokio::test]
    async fn test_prints_reply_and_stops_on_exit() {
        let llm = Arc::new(ScriptedLlmClient::new([Message::assistant("All done.")]));
        let (orch, rx) = orchestrator(llm.clone());
        let mut session = Session::default();
        let mut out = Vec::new();

        let handled = run_repl(&orch, &mut session, rx, &b"hello\nexit\nignored\n"[..], &mut out)
            .await
            .unwrap();

        assert_eq!(handled, 1);
        assert_eq!(llm.call_count(), 1);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("All done."));
    }

    #[tokio::test]
    async fn test_error_is_reported_and_loop_continues() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push_error(LlmError::EmptyResponse);
        llm.push_reply(Message::assistant("recovered"));
        let (orch, rx) = orchestrator(llm.clone());
        let mut session = Session::default();
        let mut out = Vec::new();

        let handled = run_repl(&orch, &mut session, rx, &b"first\nsecond\n"[..], &mut out)
            .await
            .unwrap();

        assert_eq!(handled, 2);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("Error: Model call failed"));
        assert!(text.contains("recovered"));
        // 失败的输入不回滚
        assert_eq!(
            session
                .conversation
                .messages()
                .iter()
                .filter(|m| matches!(m, Message::Human { .. }))
                .count(),
            2
        );
    }
}
