//! 工具参数 Schema 生成（schemars 从参数结构体派生）
//!
//! 模型端只接受 OpenAPI 子集：子 schema 内联，去掉 `$schema`、`title`、`definitions`。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;

/// 由参数结构体生成工具参数 schema
pub fn parameters_schema_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::openapi3().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| Value::Object(Default::default()));
    strip_metadata(&mut value);
    value
}

fn strip_metadata(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("title");
            map.remove("definitions");
            for (key, child) in map.iter_mut() {
                match (key.as_str(), child) {
                    // properties 的键是参数名，不能当作元数据删除
                    ("properties", Value::Object(props)) => {
                        props.values_mut().for_each(strip_metadata)
                    }
                    (_, child) => strip_metadata(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_metadata),
        _ => {}
    }
}

/// 将 functionCall.args 解析为参数结构体；失败时返回带工具名的错误文本
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| {
        AgentError::InvalidArguments {
            tool: tool.to_string(),
            reason: e.to_string(),
        }
        .to_string()
    })
}
