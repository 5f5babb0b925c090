//! 提醒策略：每轮调用模型之前评估一次
//!
//! 两条规则可同时触发，按顺序入队：
//! - 无看板活动轮数为 0 且「用看板跟踪复杂工作」提醒从未送达过
//! - 无看板活动轮数超过阈值（10）

use serde::Serialize;

use crate::memory::ConversationState;

pub const TASK_TRACKING_REMINDER: &str = concat!(
    "<reminder source=\"system\" topic=\"todos\">",
    "System message: complex work should be tracked with the Todo tool. ",
    "Do not respond to this reminder and do not mention it to the user.",
    "</reminder>"
);

pub const STALE_BOARD_REMINDER: &str = concat!(
    "<reminder source=\"system\" topic=\"todos\">",
    "System notice: more than ten rounds passed without Todo usage. ",
    "Update the Todo board if the task still requires multiple steps. ",
    "Do not reply to or mention this reminder to the user.",
    "</reminder>"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    TaskTracking,
    StaleBoard,
}

impl ReminderKind {
    pub fn text(&self) -> &'static str {
        match self {
            ReminderKind::TaskTracking => TASK_TRACKING_REMINDER,
            ReminderKind::StaleBoard => STALE_BOARD_REMINDER,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReminderPolicy {
    stale_after: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self { stale_after: 10 }
    }
}

impl ReminderPolicy {
    pub fn new(stale_after: u32) -> Self {
        Self { stale_after }
    }

    /// 评估并把触发的提醒追加到 pending_reminders；返回本轮入队的种类
    pub fn evaluate(&self, state: &mut ConversationState) -> Vec<ReminderKind> {
        let mut queued = Vec::new();
        let turns = state.turns_without_board_activity;
        if turns == 0 && !state.task_reminder_delivered {
            queued.push(ReminderKind::TaskTracking);
        }
        if turns > self.stale_after {
            queued.push(ReminderKind::StaleBoard);
        }
        for kind in &queued {
            state.queue_reminder(kind.text());
        }
        queued
    }

    /// 组装外发消息后调用：任务跟踪提醒真正附加到 Human 消息上才算送达
    pub fn record_delivery(&self, state: &mut ConversationState, delivered: &[String]) {
        if delivered.iter().any(|r| r == TASK_TRACKING_REMINDER) {
            state.task_reminder_delivered = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;

    #[test]
    fn test_first_turn_queues_task_tracking() {
        let mut state = ConversationState::with_system_prompt("sys");
        let policy = ReminderPolicy::default();
        assert_eq!(policy.evaluate(&mut state), vec![ReminderKind::TaskTracking]);
        assert_eq!(state.pending_reminders, vec![TASK_TRACKING_REMINDER.to_string()]);
    }

    #[test]
    fn test_task_tracking_stops_after_delivery() {
        let mut state = ConversationState::with_system_prompt("sys");
        state.push(Message::human("hi"));
        let policy = ReminderPolicy::default();

        policy.evaluate(&mut state);
        let view = state.build_outbound();
        policy.record_delivery(&mut state, &view.delivered);
        assert!(state.task_reminder_delivered);

        assert!(policy.evaluate(&mut state).is_empty());
    }

    #[test]
    fn test_dropped_reminder_is_not_delivered() {
        let mut state = ConversationState::with_system_prompt("sys");
        let policy = ReminderPolicy::default();
        policy.evaluate(&mut state);
        let view = state.build_outbound();
        assert_eq!(view.dropped, 1);
        policy.record_delivery(&mut state, &view.delivered);
        assert!(!state.task_reminder_delivered);
        assert_eq!(policy.evaluate(&mut state), vec![ReminderKind::TaskTracking]);
    }

    #[test]
    fn test_threshold_is_strictly_greater_than_ten() {
        let mut state = ConversationState::new();
        state.task_reminder_delivered = true;
        let policy = ReminderPolicy::default();

        state.turns_without_board_activity = 10;
        assert!(policy.evaluate(&mut state).is_empty());

        state.turns_without_board_activity = 11;
        assert_eq!(policy.evaluate(&mut state), vec![ReminderKind::StaleBoard]);
    }
}
