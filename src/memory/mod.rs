//! 记忆层：对话消息与会话状态

pub mod conversation;

pub use conversation::{
    ContentBlock, ConversationState, Message, MessageContent, OutboundView, ToolCall,
};
