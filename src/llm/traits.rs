//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock / Scripted）实现 LlmClient：invoke 接收外发消息与工具描述，返回一条 Assistant 消息。

use async_openai::error::OpenAIError;
use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;
use crate::tools::ToolSpec;

/// 模型调用失败（传输层）
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    #[error("Response contained no choices")]
    EmptyResponse,
}

impl From<OpenAIError> for LlmError {
    fn from(e: OpenAIError) -> Self {
        match &e {
            OpenAIError::ApiError(api) => Self::Api(api.message.clone()),
            OpenAIError::InvalidArgument(msg) => Self::InvalidRequest(msg.clone()),
            OpenAIError::JSONDeserialize(..) => Self::Decode(e.to_string()),
            _ => Self::Http(e.to_string()),
        }
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 调用模型；可能长时间阻塞，失败时返回 LlmError
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
