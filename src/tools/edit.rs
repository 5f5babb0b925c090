//! edit_text：对工作区内文本文件做小而精确的修改（替换 / 插入行 / 删除行区间）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::{AgentError, Session};
use crate::tools::{Sandbox, Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Replace,
    Insert,
    DeleteRange,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditTextArgs {
    /// Path relative to the workspace root
    pub path: String,
    /// replace | insert | delete_range
    pub action: EditAction,
    /// replace: text to find (every occurrence is replaced)
    pub find: Option<String>,
    /// replace: replacement text (default empty)
    pub replace: Option<String>,
    /// insert: 0-based line index to insert after; -1 inserts before the first line
    pub insert_after: Option<i64>,
    /// insert: the line to insert
    pub new_text: Option<String>,
    /// delete_range: first line to delete (0-based)
    pub range_start: Option<usize>,
    /// delete_range: end of range (exclusive)
    pub range_end: Option<usize>,
}

pub struct EditTextTool {
    sandbox: Sandbox,
}

impl EditTextTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

fn apply_edit(text: &str, args: &EditTextArgs) -> Result<(String, String), AgentError> {
    match args.action {
        EditAction::Replace => {
            let find = args
                .find
                .as_deref()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| AgentError::tool("edit_text.replace missing find"))?;
            let replaced = text.replace(find, args.replace.as_deref().unwrap_or(""));
            let summary = format!("replace done ({} bytes)", replaced.len());
            Ok((replaced, summary))
        }
        EditAction::Insert => {
            let requested = args.insert_after.unwrap_or(-1);
            let mut rows: Vec<&str> = text.split('\n').collect();
            let last = rows.len() as i64 - 1;
            let idx = requested.clamp(-1, last);
            rows.insert((idx + 1) as usize, args.new_text.as_deref().unwrap_or(""));
            Ok((rows.join("\n"), format!("inserted after line {}", requested)))
        }
        EditAction::DeleteRange => {
            let (start, end) = match (args.range_start, args.range_end) {
                (Some(s), Some(e)) if e >= s => (s, e),
                _ => return Err(AgentError::tool("edit_text.delete_range invalid range")),
            };
            let rows: Vec<&str> = text.split('\n').collect();
            let head = start.min(rows.len());
            let tail = end.min(rows.len());
            let kept: Vec<&str> = rows[..head].iter().chain(&rows[tail..]).copied().collect();
            Ok((kept.join("\n"), format!("deleted lines [{}, {})", start, end)))
        }
    }
}

#[async_trait]
impl Tool for EditTextTool {
    type Args = EditTextArgs;

    fn name(&self) -> &str {
        "edit_text"
    }

    fn description(&self) -> &str {
        "Apply small, precise edits to a text file: replace all occurrences, insert a line, or delete a line range."
    }

    async fn call(&self, args: EditTextArgs, _session: &mut Session) -> Result<String, AgentError> {
        let resolved = self.sandbox.resolve_path(&args.path)?;
        let text = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| AgentError::tool(format!("read {} failed: {}", args.path, e)))?;
        let (updated, summary) = apply_edit(&text, &args)?;
        tokio::fs::write(&resolved, updated.as_bytes()).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(action: EditAction) -> EditTextArgs {
        EditTextArgs {
            path: "f.txt".into(),
            action,
            find: None,
            replace: None,
            insert_after: None,
            new_text: None,
            range_start: None,
            range_end: None,
        }
    }

    #[test]
    fn test_replace_every_occurrence() {
        let mut a = args(EditAction::Replace);
        a.find = Some("foo".into());
        a.replace = Some("bar".into());
        let (out, summary) = apply_edit("foo foo\nfoo", &a).unwrap();
        assert_eq!(out, "bar bar\nbar");
        assert_eq!(summary, "replace done (11 bytes)");

        a.find = Some(String::new());
        assert!(matches!(apply_edit("x", &a), Err(AgentError::Tool(_))));
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut a = args(EditAction::Insert);
        a.new_text = Some("new".into());
        let (out, summary) = apply_edit("a\nb", &a).unwrap();
        assert_eq!(out, "new\na\nb");
        assert_eq!(summary, "inserted after line -1");

        a.insert_after = Some(0);
        assert_eq!(apply_edit("a\nb", &a).unwrap().0, "a\nnew\nb");

        a.insert_after = Some(99);
        assert_eq!(apply_edit("a\nb", &a).unwrap().0, "a\nb\nnew");

        a.insert_after = Some(-7);
        assert_eq!(apply_edit("a\nb", &a).unwrap().0, "new\na\nb");
    }

    #[test]
    fn test_delete_range_half_open() {
        let mut a = args(EditAction::DeleteRange);
        a.range_start = Some(1);
        a.range_end = Some(3);
        let (out, summary) = apply_edit("0\n1\n2\n3", &a).unwrap();
        assert_eq!(out, "0\n3");
        assert_eq!(summary, "deleted lines [1, 3)");

        a.range_end = Some(0);
        assert!(matches!(apply_edit("0", &a), Err(AgentError::Tool(_))));
    }

    #[test]
    fn test_unknown_action_rejected_by_schema() {
        let err = serde_json::from_value::<EditTextArgs>(serde_json::json!({
            "path": "f.txt",
            "action": "rotate"
        }));
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_edit_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "hello world").unwrap();
        let tool = EditTextTool::new(Sandbox::new(dir.path(), 1000).unwrap());
        let mut a = args(EditAction::Replace);
        a.find = Some("world".into());
        a.replace = Some("rust".into());
        let mut session = Session::default();
        tool.call(a, &mut session).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "hello rust");
    }
}
