//! TestPilot - 工具驱动的测试用例生成智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话上下文、任务看板、回合状态机
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）
//! - **memory**: 消息类型与对话状态
//! - **observability**: tracing 日志初始化
//! - **react**: 提醒策略、回合事件、system prompt
//! - **tools**: 沙箱、工具派发表（bash、文件读写编辑、todo_write、测试生成）与执行器
//! - **ui**: 终端输出、心跳指示、REPL

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
pub mod ui;
