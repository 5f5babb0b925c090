//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

/// 根据配置与环境变量选择 LLM 后端；provider 为 mock 或缺少 API Key 时回退到 Mock
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    if cfg.provider.eq_ignore_ascii_case("mock") {
        tracing::info!("Using Mock LLM (provider = mock)");
        return Arc::new(MockLlmClient);
    }
    let api_key = match std::env::var(&cfg.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            tracing::warn!("{} not set, using Mock LLM", cfg.api_key_env);
            return Arc::new(MockLlmClient);
        }
    };
    tracing::info!("Using OpenAI-compatible LLM ({} @ {})", cfg.model, cfg.base_url);
    Arc::new(OpenAiClient::new(
        &cfg.base_url,
        &cfg.model,
        &api_key,
        cfg.request_timeout_secs,
        cfg.max_tokens,
    ))
}
