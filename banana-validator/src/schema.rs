//! 载荷形状检查
//!
//! 在字段规则之前运行：拒绝未声明的属性，并按选项检查缺失的属性。

use crate::error::{ValidationError, ValidationResult};
use crate::validator::{Validate, ValidatorBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 声明的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// 载荷中的属性名（已考虑 `#[serde(rename)]`）
    pub name: &'static str,
    /// 字段类型是否为 `Option<T>`
    pub optional: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str) -> Self {
        Self { name, optional: false }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self { name, optional: true }
    }
}

/// 声明了字段列表的请求数据形状，通常由 `#[derive(Validate)]` 生成
pub trait Schema {
    fn fields() -> &'static [FieldSpec];

    fn declares(name: &str) -> bool {
        Self::fields().iter().any(|f| f.name == name)
    }
}

/// 校验选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// 为 true 时只有非 `Option` 字段必须出现；为 false 时所有声明的字段都必须出现
    pub skip_missing_properties: bool,
    /// 拒绝未声明的属性
    pub forbid_unknown_fields: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            skip_missing_properties: false,
            forbid_unknown_fields: true,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_missing_properties(mut self, skip: bool) -> Self {
        self.skip_missing_properties = skip;
        self
    }

    pub fn forbid_unknown_fields(mut self, forbid: bool) -> Self {
        self.forbid_unknown_fields = forbid;
        self
    }
}

/// 检查载荷的属性集合
///
/// `entries` 为 (属性名, 是否有值)。先按声明顺序报告缺失字段，再按出现顺序报告未声明的属性。
pub fn check_shape<S, I>(entries: I, options: &ValidationOptions) -> ValidationResult<()>
where
    S: Schema,
    I: IntoIterator<Item = (String, bool)>,
{
    let entries: Vec<(String, bool)> = entries.into_iter().collect();
    let mut builder = ValidatorBuilder::new();

    for field in S::fields() {
        let present = entries
            .iter()
            .any(|(name, has_value)| name == field.name && *has_value);
        let required = !field.optional || !options.skip_missing_properties;
        if !present && required {
            builder.add_error(field.name, format!("{} must not be null", field.name));
        }
    }

    if options.forbid_unknown_fields {
        for (name, _) in &entries {
            if !S::declares(name) {
                builder.add_error(name.as_str(), format!("property {} should not exist", name));
            }
        }
    }

    builder.build()
}

/// 校验 JSON 值并转换为目标类型
///
/// 顺序：形状检查、反序列化、字段规则。JSON `null` 视为缺失。
pub fn validate_value<S>(value: Value, options: &ValidationOptions) -> ValidationResult<S>
where
    S: Schema + Validate + DeserializeOwned,
{
    let object = match &value {
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::new(format!(
                "payload must be an object, but was {}",
                json_type_name(other)
            )))
        }
    };

    check_shape::<S, _>(
        object.iter().map(|(k, v)| (k.clone(), !v.is_null())),
        options,
    )?;

    let data: S = serde_json::from_value(value).map_err(|e| ValidationError::new(e.to_string()))?;
    data.validate()?;
    Ok(data)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
