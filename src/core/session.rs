//! 会话上下文
//!
//! 会话开始时创建，按引用交给编排器与每个工具处理器；对话状态与任务看板只由编排器所在的单一控制流修改。

use crate::config::BoardSection;
use crate::core::TaskBoard;
use crate::memory::ConversationState;

#[derive(Debug, Default)]
pub struct Session {
    pub conversation: ConversationState,
    pub board: TaskBoard,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>, board: &BoardSection) -> Self {
        Self {
            conversation: ConversationState::with_system_prompt(system_prompt),
            board: TaskBoard::new(board.allowed_statuses.clone(), board.max_items),
        }
    }

    /// 看板更新的横切副作用：清零「无看板活动轮数」，ReminderPolicy 下一次评估即可见
    pub fn note_board_activity(&mut self) {
        self.conversation.turns_without_board_activity = 0;
    }
}
