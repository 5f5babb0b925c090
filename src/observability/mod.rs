//! 可观测性：tracing 日志写到 stderr，保持 REPL 的 stdout 干净

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认 warn，可通过 RUST_LOG 覆盖；重复调用时忽略
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
