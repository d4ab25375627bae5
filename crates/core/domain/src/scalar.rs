use serde::{Deserialize, Deserializer};

/// 外部系统传来的标量（字符串/数字/布尔），统一按字符串处理。
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

pub(crate) fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(value) => value,
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => value.to_string(),
        // 设备命令语法只认 0/1
        Scalar::Bool(true) => "1".to_string(),
        Scalar::Bool(false) => "0".to_string(),
    })
}
