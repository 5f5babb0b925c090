//! 回合过程事件：编排器在状态切换、提醒、模型回复、工具调用时发布，供终端展示或测试收集

use serde::Serialize;

use crate::core::TurnState;
use crate::react::ReminderKind;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// 状态机切换
    StateChanged { from: TurnState, to: TurnState },
    /// 本轮入队的提醒
    ReminderQueued { kind: ReminderKind },
    /// 没有 Human 消息可附加，提醒被丢弃
    RemindersDropped { count: usize },
    /// 模型回复的文本部分
    AssistantText { text: String },
    /// 调用工具
    ToolCall {
        name: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    ToolResult {
        name: String,
        ok: bool,
        preview: String,
    },
}
