//! 回合层：提醒策略、过程事件、system prompt

pub mod events;
pub mod prompt;
pub mod reminder;

pub use events::TurnEvent;
pub use prompt::build_system_prompt;
pub use reminder::{ReminderKind, ReminderPolicy};
