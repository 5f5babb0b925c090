//! 工具注册表
//!
//! 每个工具实现带类型参数的 Tool trait；blanket impl 把它擦除为对象安全的 ToolHandler，
//! 在进入处理器之前按参数 schema 反序列化（参数不合法直接返回 Tool 错误）。
//! ToolRegistry 按名注册与查找，ToolExecutor 在调用时加超时、审计并把错误转为文本。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::{AgentError, Session};
use crate::tools::schema::parameters_schema;

/// 工具 trait：名称、描述（供模型理解）、类型化参数、执行
#[async_trait]
pub trait Tool: Send + Sync {
    /// 参数类型；其 JSON Schema 即告知模型的 parameters
    type Args: DeserializeOwned + JsonSchema + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn call(&self, args: Self::Args, session: &mut Session) -> Result<String, AgentError>;
}

/// 擦除参数类型后的处理器（注册表中存放的形态）
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    /// 校验并反序列化参数后执行
    async fn execute(&self, args: Value, session: &mut Session) -> Result<String, AgentError>;
}

#[async_trait]
impl<T: Tool> ToolHandler for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<T::Args>()
    }

    async fn execute(&self, args: Value, session: &mut Session) -> Result<String, AgentError> {
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let typed: T::Args = serde_json::from_value(args).map_err(|e| {
            AgentError::Tool(format!("invalid arguments for {}: {}", Tool::name(self), e))
        })?;
        self.call(typed, session).await
    }
}

/// 交给模型的工具描述（function calling 的 name / description / parameters）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具注册表：按名称存储 Arc<dyn ToolHandler>，保留注册顺序
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名工具后注册者覆盖先注册者
    pub fn register(&mut self, tool: impl ToolHandler + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 按注册顺序生成工具描述
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        text: String,
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        type Args = EchoArgs;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text"
        }

        async fn call(&self, args: EchoArgs, _session: &mut Session) -> Result<String, AgentError> {
            Ok(args.text)
        }
    }

    #[tokio::test]
    async fn test_typed_args_are_validated_before_call() {
        let mut session = Session::default();
        let ok = EchoTool
            .execute(serde_json::json!({"text": "hi"}), &mut session)
            .await
            .unwrap();
        assert_eq!(ok, "hi");

        let err = EchoTool
            .execute(serde_json::json!({"text": 3}), &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Tool(ref m) if m.starts_with("invalid arguments for echo")));
    }

    #[test]
    fn test_specs_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(EchoTool);
        assert_eq!(registry.len(), 1);
        let specs = registry.specs();
        assert_eq!(specs[0].name, "echo");
        assert_eq!(specs[0].parameters["properties"]["text"]["type"], "string");
    }
}
