pub mod edit;
pub mod executor;
pub mod filesystem;
pub mod process;
pub mod registry;
pub mod sandbox;
pub mod schema;
pub mod shell;
pub mod test_gen;
pub mod todo;

use std::sync::Arc;

use crate::config::ToolsSection;

pub use edit::EditTextTool;
pub use executor::{ToolExecutor, ToolOutcome};
pub use filesystem::{ReadFileTool, WriteFileTool};
pub use registry::{Tool, ToolHandler, ToolRegistry, ToolSpec};
pub use sandbox::{clamp, Sandbox};
pub use schema::parameters_schema;
pub use shell::BashTool;
pub use test_gen::{register_test_gen_tools, CommandBackend, TestGenBackend, TestGenOp};
pub use todo::TodoWriteTool;

/// 组装完整的工具派发表：沙箱文件/命令工具、todo_write、七个测试生成工具
pub fn build_registry(
    tools: &ToolsSection,
    sandbox: &Sandbox,
    backend: Arc<dyn TestGenBackend>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(BashTool::new(sandbox.clone(), tools.bash_default_timeout_ms));
    registry.register(ReadFileTool::new(sandbox.clone()));
    registry.register(WriteFileTool::new(sandbox.clone()));
    registry.register(EditTextTool::new(sandbox.clone()));
    registry.register(TodoWriteTool);
    register_test_gen_tools(&mut registry, backend, sandbox);
    registry
}
