//! System prompt：优先读 config/prompts/system.txt，`{workspace}` 替换为沙箱根目录

use std::path::Path;

use crate::config::load_prompt_template;

const FALLBACK_PROMPT: &str = "You are a coding agent operating INSIDE the user's repository at {workspace}.

Follow this loop: plan briefly, act with tools (read_file / write_file / edit_text / bash), then report concise results.
Use todo_write to maintain multi-step plans; only one item may be in_progress at a time.
Stay inside the workspace and avoid destructive or privileged commands.
After finishing, summarize what changed and how to run or test it.";

pub fn render_system_prompt(template: &str, workspace: &Path) -> String {
    template.replace("{workspace}", &workspace.display().to_string())
}

/// 读取模板并渲染；模板缺失时使用内置 prompt
pub fn build_system_prompt(workspace: &Path) -> String {
    let template = load_prompt_template().unwrap_or_else(|| {
        tracing::warn!("config/prompts/system.txt not found, using built-in prompt");
        FALLBACK_PROMPT.to_string()
    });
    render_system_prompt(&template, workspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_substituted() {
        let out = render_system_prompt(FALLBACK_PROMPT, Path::new("/tmp/ws"));
        assert!(out.contains("repository at /tmp/ws."));
        assert!(!out.contains("{workspace}"));
    }
}
