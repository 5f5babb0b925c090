//! todo_write：整体替换任务看板
//!
//! 参数列表经 TaskBoard::update 原子校验；成功后清零会话的「无看板活动轮数」。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::{AgentError, ProposedTask, Session};
use crate::tools::Tool;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TodoWriteArgs {
    /// The complete todo list (replaces the current board)
    #[serde(default)]
    pub items: Vec<ProposedTask>,
}

pub struct TodoWriteTool;

#[async_trait]
impl Tool for TodoWriteTool {
    type Args = TodoWriteArgs;

    fn name(&self) -> &str {
        "todo_write"
    }

    fn description(&self) -> &str {
        "Update the shared todo board. Send the full list each time; at most one item may be in_progress."
    }

    async fn call(&self, args: TodoWriteArgs, session: &mut Session) -> Result<String, AgentError> {
        let view = session.board.update(&args.items)?;
        session.note_board_activity();
        Ok(format!("{}\n\n{}", view, session.board.summary()))
    }
}
