//! 核心编排层：错误、会话上下文、任务看板、主控状态机

pub mod error;
pub mod orchestrator;
pub mod session;
pub mod task_board;

pub use error::AgentError;
pub use orchestrator::{Orchestrator, TurnOutcome, TurnState};
pub use session::Session;
pub use task_board::{BoardStats, ProposedTask, TaskBoard, TaskItem, TaskStatus};
