use std::fmt;
use thiserror::Error;

/// 单个字段的校验失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// 验证错误
///
/// 字段错误按声明顺序保存，每个字段至多一条
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 无法归属到字段的错误（数据无法解析、类型不匹配等）
    #[error("{0}")]
    ValidationFailed(String),

    #[error("{}", join_messages(.0))]
    FieldErrors(Vec<FieldError>),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldErrors(vec![FieldError::new(field, message)])
    }

    /// 追加字段错误；同一字段已有错误时忽略（每个字段只报告第一条失败的规则）
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        if let Self::FieldErrors(errors) = self {
            let field = field.into();
            if !errors.iter().any(|e| e.field == field) {
                errors.push(FieldError::new(field, message));
            }
        }
    }

    pub fn merge(&mut self, other: ValidationError) {
        if let Self::FieldErrors(others) = other {
            for error in others {
                self.add_field_error(error.field, error.message);
            }
        }
    }

    /// 返回给调用方的消息：各字段的约束文本以 ", " 连接
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// 失败的字段名（按出现顺序）
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::FieldErrors(errors) => errors.iter().map(|e| e.field.as_str()).collect(),
            Self::ValidationFailed(_) => Vec::new(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_joins_fields_in_order() {
        let mut error = ValidationError::field_error("page", "page must be at least 1, but was 0");
        error.add_field_error("limit", "limit must not be null");
        assert_eq!(
            error.message(),
            "page must be at least 1, but was 0, limit must not be null"
        );
        assert_eq!(error.fields(), vec!["page", "limit"]);
    }

    #[test]
    fn test_first_error_per_field_wins() {
        let mut error = ValidationError::field_error("name", "name must not be empty");
        error.add_field_error("name", "name length must be at least 2, but was 0");
        assert_eq!(error.message(), "name must not be empty");
    }

    #[test]
    fn test_merge() {
        let mut error = ValidationError::field_error("a", "a is wrong");
        error.merge(ValidationError::field_error("b", "b is wrong"));
        error.merge(ValidationError::new("ignored"));
        assert_eq!(error.fields(), vec!["a", "b"]);
    }

    #[test]
    fn test_plain_message() {
        assert_eq!(ValidationError::new("bad json").message(), "bad json");
    }
}
