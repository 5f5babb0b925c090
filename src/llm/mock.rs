//! Mock LLM 客户端（无需 API）
//!
//! MockLlmClient 取最后一条 Human 消息回显为纯文本（无工具调用），本地即可跑通 REPL；
//! ScriptedLlmClient 按预设顺序返回回复并记录每次收到的外发消息，供测试驱动编排器。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;
use crate::tools::ToolSpec;

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn invoke(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::Human { .. }))
            .map(Message::text)
            .unwrap_or_else(|| "(no input)".to_string());
        Ok(Message::assistant(format!("Echo from Mock: {}", last_user)))
    }
}

/// 脚本客户端：依次弹出预设回复；队列耗尽后返回 fallback（未设置则 EmptyResponse）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<Message, LlmError>>>,
    fallback: Option<Message>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// 队列耗尽后一直返回同一条回复
    pub fn with_fallback(mut self, reply: Message) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// 追加一次失败
    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err));
        }
    }

    pub fn push_reply(&self, reply: Message) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(reply));
        }
    }

    /// 每次调用收到的外发消息（按调用顺序）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn invoke(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message, LlmError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(messages.to_vec());
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(reply) => reply,
            None => self.fallback.clone().ok_or(LlmError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_human() {
        let reply = MockLlmClient
            .invoke(&[Message::system("s"), Message::human("hello")], &[])
            .await
            .unwrap();
        assert_eq!(reply.text(), "Echo from Mock: hello");
        assert!(reply.tool_calls().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_order_and_fallback() {
        let client = ScriptedLlmClient::new([Message::assistant("one")])
            .with_fallback(Message::assistant("again"));
        client.push_error(LlmError::EmptyResponse);
        assert_eq!(client.invoke(&[], &[]).await.unwrap().text(), "one");
        assert!(client.invoke(&[], &[]).await.is_err());
        assert_eq!(client.invoke(&[], &[]).await.unwrap().text(), "again");
        assert_eq!(client.call_count(), 3);
    }
}
