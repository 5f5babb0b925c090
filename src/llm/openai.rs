//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url，原生 tool calling）；支持 OpenAI、DeepSeek、自建代理等。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCalls, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionResponseMessage, ChatCompletionTools, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名与单次请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: Option<u32>,
    timeout_secs: u64,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
        max_tokens: Option<u32>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(base_url.trim_end_matches('/'))
            .with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            max_tokens,
            timeout_secs,
            usage: TokenUsage::new(),
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if !tools.is_empty() {
            let tools = tools
                .iter()
                .map(to_request_tool)
                .collect::<Result<Vec<_>, _>>()?;
            args.tools(tools);
        }
        if let Some(max_tokens) = self.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        Ok(args.build()?)
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
    let request = match message {
        Message::System { content } => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content.as_text())
                .build()?,
        ),
        Message::Human { content } => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content.as_text())
                .build()?,
        ),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            let text = content.as_text();
            if !text.is_empty() {
                args.content(text);
            }
            if !tool_calls.is_empty() {
                let calls = tool_calls
                    .iter()
                    .map(to_request_tool_call)
                    .collect::<Result<Vec<_>, _>>()?;
                args.tool_calls(calls);
            }
            ChatCompletionRequestMessage::Assistant(args.build()?)
        }
        Message::ToolResult {
            call_id, content, ..
        } => ChatCompletionRequestMessage::Tool(
            ChatCompletionRequestToolMessageArgs::default()
                .content(content.clone())
                .tool_call_id(call_id.clone())
                .build()?,
        ),
    };
    Ok(request)
}

// 按线上 JSON 形态构造，再反序列化为 async_openai 的类型
fn to_request_tool_call(call: &ToolCall) -> Result<ChatCompletionMessageToolCalls, LlmError> {
    serde_json::from_value(json!({
        "id": call.id,
        "type": "function",
        "function": {"name": call.name, "arguments": call.arguments.to_string()},
    }))
    .map_err(|e| LlmError::InvalidRequest(format!("tool call {}: {}", call.id, e)))
}

fn to_request_tool(spec: &ToolSpec) -> Result<ChatCompletionTools, LlmError> {
    serde_json::from_value(json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    }))
    .map_err(|e| LlmError::InvalidRequest(format!("tool {}: {}", spec.name, e)))
}

/// 把响应消息转成 Assistant；非 function 形态的工具调用被忽略
fn to_assistant_message(message: ChatCompletionResponseMessage) -> Message {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|call| match call {
            ChatCompletionMessageToolCalls::Function(call) => Some(to_tool_call(
                call.id,
                call.function.name,
                &call.function.arguments,
            )),
            other => {
                tracing::warn!(call = ?other, "Ignoring non-function tool call");
                None
            }
        })
        .collect();
    Message::assistant_with_calls(message.content.unwrap_or_default(), tool_calls)
}

fn to_tool_call(id: String, name: String, arguments: &str) -> ToolCall {
    let id = if id.trim().is_empty() {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    } else {
        id
    };
    // arguments 为 JSON 字符串；解析失败时原样保留，由派发边界报参数错误
    let arguments = if arguments.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
    };
    ToolCall {
        id,
        name,
        arguments,
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, LlmError> {
        let request = self.build_request(messages, tools)?;
        tracing::info!(model = %self.model, messages = messages.len(), tools = tools.len(), "Calling LLM API");

        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| LlmError::Timeout(self.timeout_secs))??;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }
        tracing::debug!(choices = response.choices.len(), "LLM API response");

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;
        Ok(to_assistant_message(choice.message))
    }
}
