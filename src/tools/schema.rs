//! 工具参数 JSON Schema 生成（schemars 自动生成）
//!
//! 子结构内联展开，去掉 `$schema` / `title`，直接作为 function 的 parameters 交给模型。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

/// 返回参数类型 T 的 JSON Schema
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.option_add_null_type = false;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| empty_object_schema());
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("definitions");
        obj.entry("properties")
            .or_insert_with(|| Value::Object(Default::default()));
    }
    value
}

fn empty_object_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}
