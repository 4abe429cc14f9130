// src/model/ident.rs

use serde_json::Value;
use tracing::debug;

/// 后端偶尔下发的占位 ID
pub const PLACEHOLDER_ID: &str = "undefined";

/// ID 是否可以用于渲染与上报
pub fn is_valid_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && id != PLACEHOLDER_ID
}

fn id_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// **ID 归一化**
/// 若记录只有数据库 `_id` 而没有 `id`，把 `_id` 拷贝到 `id`；
/// 最终 ID 为空或为 "undefined" 的记录返回 None（静默丢弃）。
pub fn normalize_record(record: Value) -> Option<Value> {
    let Value::Object(mut map) = record else {
        return None;
    };

    let client_id = map.get("id").and_then(id_as_string).filter(|s| !s.trim().is_empty());
    let id = match client_id {
        Some(id) => id,
        None => {
            let backend_id = map.get("_id").and_then(id_as_string)?;
            map.insert("id".to_string(), Value::String(backend_id.clone()));
            backend_id
        }
    };

    if !is_valid_id(&id) {
        return None;
    }
    // 数字 ID 统一成字符串
    map.insert("id".to_string(), Value::String(id));
    Some(Value::Object(map))
}

pub fn normalize_records(records: Vec<Value>) -> Vec<Value> {
    let total = records.len();
    let kept: Vec<Value> = records.into_iter().filter_map(normalize_record).collect();
    if kept.len() < total {
        debug!(dropped = total - kept.len(), "dropped records without a usable id");
    }
    kept
}
