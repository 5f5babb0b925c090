//! 任务看板：受约束的 TODO 列表
//!
//! update 以「整体替换」方式原子更新：先对提议的完整列表做全部校验，任一规则不满足则返回
//! TaskValidation 错误且看板保持原样；成功后替换内容并返回渲染视图。

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crossterm::style::{Color, Stylize};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;

/// 看板有变化时 todo_write 结果中的确认语
pub const STATUS_UPDATED_MARKER: &str = "Status updated";
/// 空看板提示语（渲染占位行与 todo_write 摘要共用）
pub const EMPTY_BOARD_MARKER: &str = "No todos";

const PENDING_COLOR: Color = Color::Rgb { r: 176, g: 176, b: 176 };
const PROGRESS_COLOR: Color = Color::Rgb { r: 120, g: 200, b: 255 };
const COMPLETED_COLOR: Color = Color::Rgb { r: 34, g: 139, b: 34 };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(()),
        }
    }
}

/// 看板中的一项
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskItem {
    pub id: String,
    pub content: String,
    pub status: TaskStatus,
    pub active_form: String,
}

/// 模型提议的一项（字段可缺省，校验后才成为 TaskItem）
#[derive(Clone, Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ProposedTask {
    /// 唯一 id；缺省时取 1 起的位置序号
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub id: Option<Value>,
    /// 待完成工作的简短描述
    #[serde(default)]
    pub content: Option<String>,
    /// pending / in_progress / completed，缺省为第一个允许的状态
    #[serde(default)]
    pub status: Option<String>,
    /// 该步骤对应的主要工具或进行时描述
    #[serde(default, rename = "activeForm", alias = "active_form")]
    pub active_form: Option<String>,
}

impl ProposedTask {
    pub fn new(id: &str, content: &str, status: &str, active_form: &str) -> Self {
        Self {
            id: Some(Value::String(id.to_string())),
            content: Some(content.to_string()),
            status: Some(status.to_string()),
            active_form: Some(active_form.to_string()),
        }
    }
}

/// 聚合统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

/// 任务看板：有序 TaskItem 列表（展示顺序即给定顺序）
#[derive(Clone, Debug)]
pub struct TaskBoard {
    items: Vec<TaskItem>,
    allowed_statuses: Vec<TaskStatus>,
    max_items: usize,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new(
            vec![
                TaskStatus::Pending,
                TaskStatus::InProgress,
                TaskStatus::Completed,
            ],
            20,
        )
    }
}

impl TaskBoard {
    pub fn new(allowed_statuses: Vec<TaskStatus>, max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            allowed_statuses,
            max_items,
        }
    }

    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    /// 原子替换整个看板；失败时看板不变
    pub fn update(&mut self, proposed: &[ProposedTask]) -> Result<String, AgentError> {
        let cleaned = self.validate(proposed)?;
        self.items = cleaned;
        Ok(self.render())
    }

    fn validate(&self, proposed: &[ProposedTask]) -> Result<Vec<TaskItem>, AgentError> {
        let default_status = self
            .allowed_statuses
            .first()
            .copied()
            .unwrap_or(TaskStatus::Pending);
        let mut cleaned = Vec::with_capacity(proposed.len());
        let mut seen_ids = HashSet::new();
        let mut in_progress = 0usize;

        for (index, raw) in proposed.iter().enumerate() {
            let id = match &raw.id {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Value::Null) | None => (index + 1).to_string(),
                Some(Value::String(_)) => (index + 1).to_string(),
                Some(other) => other.to_string(),
            };
            if !seen_ids.insert(id.clone()) {
                return Err(AgentError::TaskValidation(format!("Duplicate todo id: {}", id)));
            }

            let content = raw.content.as_deref().unwrap_or("").trim();
            if content.is_empty() {
                return Err(AgentError::TaskValidation(
                    "Todo content cannot be empty".to_string(),
                ));
            }

            let status = match raw.status.as_deref().map(str::trim) {
                None | Some("") => default_status,
                Some(s) => s
                    .to_lowercase()
                    .parse::<TaskStatus>()
                    .ok()
                    .filter(|st| self.allowed_statuses.contains(st))
                    .ok_or_else(|| {
                        AgentError::TaskValidation(format!(
                            "Status must be one of {}",
                            self.allowed_list()
                        ))
                    })?,
            };
            if status == TaskStatus::InProgress {
                in_progress += 1;
            }

            let active_form = raw.active_form.as_deref().unwrap_or("").trim();
            if active_form.is_empty() {
                return Err(AgentError::TaskValidation(
                    "Todo activeForm cannot be empty".to_string(),
                ));
            }

            cleaned.push(TaskItem {
                id,
                content: content.to_string(),
                status,
                active_form: active_form.to_string(),
            });

            if cleaned.len() > self.max_items {
                return Err(AgentError::TaskValidation(format!(
                    "Todo list is limited to {} items",
                    self.max_items
                )));
            }
        }

        if in_progress > 1 {
            return Err(AgentError::TaskValidation(
                "Only one task can be in_progress at a time".to_string(),
            ));
        }

        Ok(cleaned)
    }

    fn allowed_list(&self) -> String {
        self.allowed_statuses
            .iter()
            .map(TaskStatus::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 每项一行：完成标记 + 按状态着色；空看板为单行占位
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return format!("☐ {} yet", EMPTY_BOARD_MARKER)
                .with(PENDING_COLOR)
                .to_string();
        }
        self.items
            .iter()
            .map(render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn stats(&self) -> BoardStats {
        BoardStats {
            total: self.items.len(),
            completed: self
                .items
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
            in_progress: self
                .items
                .iter()
                .filter(|t| t.status == TaskStatus::InProgress)
                .count(),
        }
    }

    /// todo_write 结果末尾的摘要；两种文案都算看板活动
    pub fn summary(&self) -> String {
        let stats = self.stats();
        if stats.total == 0 {
            format!("{} have been created.", EMPTY_BOARD_MARKER)
        } else {
            format!(
                "{}: {} completed, {} in progress.",
                STATUS_UPDATED_MARKER, stats.completed, stats.in_progress
            )
        }
    }
}

fn render_line(item: &TaskItem) -> String {
    match item.status {
        TaskStatus::Completed => format!("☒ {}", item.content)
            .with(COMPLETED_COLOR)
            .crossed_out()
            .to_string(),
        TaskStatus::InProgress => format!("☐ {}", item.content)
            .with(PROGRESS_COLOR)
            .to_string(),
        TaskStatus::Pending => format!("☐ {}", item.content)
            .with(PENDING_COLOR)
            .to_string(),
    }
}

/// 结果文本是否表示看板活动（状态变更确认或空看板提示）
pub fn signals_board_activity(text: &str) -> bool {
    text.contains(STATUS_UPDATED_MARKER) || text.contains(EMPTY_BOARD_MARKER)
}
