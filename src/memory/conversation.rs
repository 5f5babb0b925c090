//! 对话记录：消息类型与 ConversationState
//!
//! Message 为带显式判别的和类型（System / Human / Assistant / ToolResult）；
//! ConversationState 是每一轮都要穿过的共享记录：消息历史、无看板活动轮数、待注入提醒队列。

use serde::{Deserialize, Serialize};

/// 文本内容：纯字符串，或一组内容块（部分后端会返回块数组）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

impl MessageContent {
    /// 拼接后的纯文本（块之间以换行连接）
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(|b| match b {
                    ContentBlock::Text { text } => text.as_str(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// 在内容前面加一段文本；块形式时整体折叠为纯文本
    fn prepend(&mut self, prefix: &str) {
        let body = self.as_text();
        *self = Self::Text(format!("{}\n\n{}", prefix, body));
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// 模型请求的一次工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: MessageContent,
    },
    Human {
        content: MessageContent,
    },
    Assistant {
        content: MessageContent,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: MessageContent::Text(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: MessageContent::Text(content.into()),
            tool_calls,
        }
    }

    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// 消息的纯文本
    pub fn text(&self) -> String {
        match self {
            Self::System { content } | Self::Human { content } => content.as_text(),
            Self::Assistant { content, .. } => content.as_text(),
            Self::ToolResult { content, .. } => content.clone(),
        }
    }

    /// Assistant 请求的工具调用；其它变体为空
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// 外发视图组装结果：消息列表，以及本轮是否把提醒成功附加到了 Human 消息上
#[derive(Debug)]
pub struct OutboundView {
    pub messages: Vec<Message>,
    /// 成功附加的提醒（按队列顺序）
    pub delivered: Vec<String>,
    /// 因没有 Human 消息而被丢弃的提醒条数
    pub dropped: usize,
}

/// 会话共享状态：消息历史只追加，插入顺序即因果顺序
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    pub turns_without_board_activity: u32,
    pub pending_reminders: Vec<String>,
    /// 「用任务看板跟踪复杂工作」提醒是否已经送达过
    pub task_reminder_delivered: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.push(Message::system(prompt));
        state
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn queue_reminder(&mut self, reminder: impl Into<String>) {
        self.pending_reminders.push(reminder.into());
    }

    /// 组装发给模型的消息：第一条 System + 全部非 System 消息；
    /// 待注入提醒按队列顺序换行拼接后加到最近一条 Human 消息前面。
    /// 无论是否找到 Human 消息，队列都会被清空；存储中的消息不被修改。
    pub fn build_outbound(&mut self) -> OutboundView {
        let mut messages: Vec<Message> = Vec::with_capacity(self.messages.len());
        if let Some(system) = self.messages.iter().find(|m| m.is_system()) {
            messages.push(system.clone());
        }
        messages.extend(self.messages.iter().filter(|m| !m.is_system()).cloned());

        let reminders = std::mem::take(&mut self.pending_reminders);
        if reminders.is_empty() {
            return OutboundView {
                messages,
                delivered: Vec::new(),
                dropped: 0,
            };
        }

        let target = messages.iter_mut().rev().find_map(|m| match m {
            Message::Human { content } => Some(content),
            _ => None,
        });
        match target {
            Some(content) => {
                content.prepend(&reminders.join("\n"));
                OutboundView {
                    messages,
                    delivered: reminders,
                    dropped: 0,
                }
            }
            None => {
                let dropped = reminders.len();
                OutboundView {
                    messages,
                    delivered: Vec::new(),
                    dropped,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_keeps_only_first_system() {
        let mut state = ConversationState::with_system_prompt("first");
        state.push(Message::human("hi"));
        state.push(Message::system("second"));
        state.push(Message::assistant("hello"));

        let view = state.build_outbound();
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[0], Message::system("first"));
        assert_eq!(view.messages.iter().filter(|m| m.is_system()).count(), 1);
        // 存储不变
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut state = ConversationState::new();
        assert!(state.is_empty());
        assert!(state.last().is_none());

        state.push(Message::human("q"));
        state.push(Message::tool_result("c1", "bash", "out"));
        assert!(!state.is_empty());
        assert_eq!(state.last(), Some(&Message::tool_result("c1", "bash", "out")));
    }

    #[test]
    fn test_reminders_prepended_to_latest_human() {
        let mut state = ConversationState::with_system_prompt("sys");
        state.push(Message::human("older"));
        state.push(Message::assistant("ok"));
        state.push(Message::human("latest"));
        state.queue_reminder("r1");
        state.queue_reminder("r2");

        let view = state.build_outbound();
        assert_eq!(view.delivered, vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(view.messages[3].text(), "r1\nr2\n\nlatest");
        assert_eq!(view.messages[1].text(), "older");
        assert!(state.pending_reminders.is_empty());
        // 外发视图是副本
        assert_eq!(state.messages()[3].text(), "latest");
    }

    #[test]
    fn test_reminders_dropped_without_human() {
        let mut state = ConversationState::with_system_prompt("sys");
        state.queue_reminder("lost");

        let view = state.build_outbound();
        assert_eq!(view.dropped, 1);
        assert!(view.delivered.is_empty());
        assert!(state.pending_reminders.is_empty());
        assert_eq!(view.messages, vec![Message::system("sys")]);
    }

    #[test]
    fn test_block_content_is_flattened_on_prepend() {
        let mut state = ConversationState::new();
        state.push(Message::Human {
            content: MessageContent::Blocks(vec![
                ContentBlock::Text { text: "a".into() },
                ContentBlock::Text { text: "b".into() },
            ]),
        });
        state.queue_reminder("note");
        let view = state.build_outbound();
        assert_eq!(view.messages[0].text(), "note\n\na\nb");
    }

    #[test]
    fn test_message_serde_tag() {
        let msg = Message::tool_result("call_1", "bash", "ok");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool_result");
        assert_eq!(json["call_id"], "call_1");
    }
}
