//! 终端层：crossterm 样式输出、等待模型时的心跳、读取-执行循环

pub mod console;
pub mod repl;
pub mod spinner;

pub use repl::{is_exit_command, run_repl};
pub use spinner::Spinner;
