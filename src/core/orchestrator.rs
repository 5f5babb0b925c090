//! Agent 编排器：回合状态机
//!
//! AwaitingInput → CallingModel → {RoutingTools | Terminal}；RoutingTools → ExecutingTools → Resetting → CallingModel。
//! 每次调用模型前评估提醒策略并组装外发消息；回复不含工具调用是唯一的结束条件。
//! 工具按请求顺序逐个执行，失败在派发边界转为 ToolResult 文本；模型调用失败向上返回给 REPL。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::task_board::signals_board_activity;
use crate::core::{AgentError, Session};
use crate::llm::LlmClient;
use crate::memory::{Message, ToolCall};
use crate::react::{ReminderPolicy, TurnEvent};
use crate::tools::{clamp, ToolExecutor, ToolSpec};
use crate::ui::Spinner;

/// 工具结果在事件中的预览上限
const RESULT_PREVIEW_CHARS: usize = 2000;

/// 回合状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    AwaitingInput,
    CallingModel,
    RoutingTools,
    ExecutingTools,
    Resetting,
    Terminal,
}

/// 一次用户输入处理完毕的结果
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// 不含工具调用的最终回复
    pub reply: Message,
    pub model_calls: usize,
    pub tool_calls: usize,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    tool_specs: Vec<ToolSpec>,
    reminders: ReminderPolicy,
    max_model_calls: usize,
    heartbeat: bool,
    event_tx: Option<UnboundedSender<TurnEvent>>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, executor: ToolExecutor, max_model_calls: usize) -> Self {
        let tool_specs = executor.specs();
        Self {
            llm,
            executor,
            tool_specs,
            reminders: ReminderPolicy::default(),
            max_model_calls,
            heartbeat: false,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: UnboundedSender<TurnEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 等待模型时在终端显示心跳（stdout 非终端时自动关闭）
    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    pub fn with_reminder_policy(mut self, policy: ReminderPolicy) -> Self {
        self.reminders = policy;
        self
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn tool_specs(&self) -> &[ToolSpec] {
        &self.tool_specs
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn transition(&self, state: &mut TurnState, to: TurnState) {
        tracing::debug!(from = ?*state, to = ?to, "turn state");
        self.emit(TurnEvent::StateChanged { from: *state, to });
        *state = to;
    }

    /// 追加一条用户输入并驱动回合直到模型不再请求工具
    pub async fn submit(&self, session: &mut Session, input: &str) -> Result<TurnOutcome, AgentError> {
        session.conversation.push(Message::human(input));
        self.run(session).await
    }

    /// 从当前会话状态开始驱动回合
    pub async fn run(&self, session: &mut Session) -> Result<TurnOutcome, AgentError> {
        let mut state = TurnState::AwaitingInput;
        let mut model_calls = 0usize;
        let mut tool_calls = 0usize;

        loop {
            self.transition(&mut state, TurnState::CallingModel);
            if model_calls >= self.max_model_calls {
                return Err(AgentError::StepLimit(self.max_model_calls));
            }
            model_calls += 1;
            let reply = self.call_model(session).await?;

            let calls = reply.tool_calls().to_vec();
            if calls.is_empty() {
                self.transition(&mut state, TurnState::Terminal);
                return Ok(TurnOutcome {
                    reply,
                    model_calls,
                    tool_calls,
                });
            }

            self.transition(&mut state, TurnState::RoutingTools);
            self.transition(&mut state, TurnState::ExecutingTools);
            tool_calls += calls.len();
            self.execute_tools(session, &calls).await;

            self.transition(&mut state, TurnState::Resetting);
            reset_after_tools(session);
        }
    }

    /// 评估提醒 → 组装外发消息 → 调用模型（期间显示心跳）→ 追加 Assistant 消息
    async fn call_model(&self, session: &mut Session) -> Result<Message, AgentError> {
        for kind in self.reminders.evaluate(&mut session.conversation) {
            self.emit(TurnEvent::ReminderQueued { kind });
        }
        let view = session.conversation.build_outbound();
        self.reminders
            .record_delivery(&mut session.conversation, &view.delivered);
        if view.dropped > 0 {
            tracing::warn!(count = view.dropped, "no human message to attach reminders to; dropped");
            self.emit(TurnEvent::RemindersDropped { count: view.dropped });
        }

        let spinner = if self.heartbeat {
            Spinner::for_stdout("Waiting for model")
        } else {
            None
        };
        let result = self.llm.invoke(&view.messages, &self.tool_specs).await;
        if let Some(spinner) = spinner {
            spinner.stop().await;
        }

        let reply = match result? {
            msg @ Message::Assistant { .. } => msg,
            other => Message::assistant(other.text()),
        };
        tracing::info!(
            tool_calls = reply.tool_calls().len(),
            outbound = view.messages.len(),
            "model replied"
        );
        let text = reply.text();
        if !text.trim().is_empty() {
            self.emit(TurnEvent::AssistantText { text });
        }
        session.conversation.push(reply.clone());
        Ok(reply)
    }

    /// 按请求顺序逐个执行；整轮结束后无看板活动轮数 +1
    async fn execute_tools(&self, session: &mut Session, calls: &[ToolCall]) {
        for call in calls {
            self.emit(TurnEvent::ToolCall {
                name: call.name.clone(),
                args: call.arguments.clone(),
            });
            let outcome = self.executor.dispatch(call, session).await;
            self.emit(TurnEvent::ToolResult {
                name: call.name.clone(),
                ok: outcome.ok,
                preview: clamp(&outcome.content, RESULT_PREVIEW_CHARS),
            });
            session
                .conversation
                .push(Message::tool_result(&call.id, &call.name, outcome.content));
        }
        let conversation = &mut session.conversation;
        conversation.turns_without_board_activity =
            conversation.turns_without_board_activity.saturating_add(1);
    }
}

/// 最近一条 ToolResult 表示看板活动时清零计数
fn reset_after_tools(session: &mut Session) {
    let latest = session
        .conversation
        .messages()
        .iter()
        .rev()
        .find_map(|m| match m {
            Message::ToolResult { content, .. } => Some(content.as_str()),
            _ => None,
        });
    if latest.map(signals_board_activity).unwrap_or(false) {
        session.note_board_activity();
    }
}
