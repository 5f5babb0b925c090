//! 终端输出：横幅、输入提示、工具行（`⏺ Kind(title)…` / `  ⎿ detail`）与回合事件的渲染
//!
//! 助手文本原样输出，不做 Markdown 渲染。

use std::path::Path;

use crossterm::style::{Color, Stylize};
use serde_json::Value;

use crate::react::TurnEvent;

const PRIMARY: Color = Color::Rgb {
    r: 120,
    g: 200,
    b: 255,
};
const ACCENT: Color = Color::Rgb {
    r: 150,
    g: 140,
    b: 255,
};
const INFO: Color = Color::Rgb {
    r: 110,
    g: 110,
    b: 110,
};

pub fn banner(title: &str, subtitle: &str, workspace: &Path) -> String {
    format!(
        "{}\n{}\n\n{}\n{}\n",
        title.with(PRIMARY),
        subtitle.with(ACCENT),
        format!("Workspace: {}", workspace.display()).with(INFO),
        "Type 'exit' to quit".with(INFO),
    )
}

pub fn prompt_label() -> String {
    format!("{}{}", "User".with(PRIMARY), " >> ".with(INFO))
}

pub fn info_line(text: &str) -> String {
    text.with(INFO).to_string()
}

pub fn tool_line(kind: &str, title: Option<&str>) -> String {
    let body = match title {
        Some(t) if !t.is_empty() => format!("{}({})…", kind, t),
        _ => kind.to_string(),
    };
    format!("⏺ {}", body).with(ACCENT).bold().to_string()
}

pub fn sub_lines(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(|l| format!("  ⎿ {}", l)).collect();
    if lines.is_empty() {
        lines.push("  ⎿ ".to_string());
    }
    lines.join("\n")
}

/// 工具名到展示用的类别与标题
fn describe_call(name: &str, args: &Value) -> (String, Option<String>) {
    let arg = |key: &str| args.get(key).and_then(Value::as_str).map(str::to_string);
    match name {
        "bash" => ("Bash".into(), arg("command")),
        "read_file" => ("Read".into(), arg("path")),
        "write_file" => ("Write".into(), arg("path")),
        "edit_text" => {
            let title = match (arg("action"), arg("path")) {
                (Some(action), Some(path)) => Some(format!("{} {}", action, path)),
                (_, path) => path,
            };
            ("Edit".into(), title)
        }
        "todo_write" => ("Update Todos".into(), None),
        other => (pascal_case(other), None),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// 需要展示的事件返回一段文本；状态切换等内部事件返回 None
pub fn render_event(event: &TurnEvent) -> Option<String> {
    match event {
        TurnEvent::AssistantText { text } if !text.trim().is_empty() => Some(text.clone()),
        TurnEvent::ToolCall { name, args } => {
            let (kind, title) = describe_call(name, args);
            Some(tool_line(&kind, title.as_deref()))
        }
        TurnEvent::ToolResult { preview, .. } => Some(sub_lines(preview)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_line_format() {
        let line = tool_line("Bash", Some("ls -la"));
        assert!(line.contains("⏺ Bash(ls -la)…"));
        assert!(tool_line("Update Todos", None).contains("⏺ Update Todos"));
    }

    #[test]
    fn test_sub_lines_prefix_every_line() {
        assert_eq!(sub_lines("a\nb"), "  ⎿ a\n  ⎿ b");
        assert_eq!(sub_lines(""), "  ⎿ ");
    }

    #[test]
    fn test_render_tool_events() {
        let ev = TurnEvent::ToolCall {
            name: "edit_text".into(),
            args: serde_json::json!({"action": "replace", "path": "a.rs"}),
        };
        assert!(render_event(&ev).unwrap().contains("Edit(replace a.rs)…"));

        let ev = TurnEvent::ToolCall {
            name: "extract_covered".into(),
            args: Value::Null,
        };
        assert!(render_event(&ev).unwrap().contains("⏺ ExtractCovered"));

        let ev = TurnEvent::AssistantText { text: "  ".into() };
        assert!(render_event(&ev).is_none());
    }
}
