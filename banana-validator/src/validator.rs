use crate::error::{ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

/// 字段规则校验
///
/// 由 `#[derive(Validate)]` 生成的代码调用，也可以在手写的 `Validate` 实现中直接使用
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

fn message_or(custom_message: Option<&str>, default: impl FnOnce() -> String) -> String {
    custom_message.map(str::to_string).unwrap_or_else(default)
}

/// 内置验证规则
///
/// 每条规则都有一个 `_with_message` 版本，自定义消息会替换默认的约束文本
pub struct ValidationRules;

impl ValidationRules {
    pub fn not_null<T>(value: &Option<T>, field: &str) -> ValidationResult<()> {
        Self::not_null_with_message(value, field, None)
    }

    pub fn not_null_with_message<T>(
        value: &Option<T>,
        field: &str,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        if value.is_none() {
            let message = message_or(custom_message, || format!("{} must not be null", field));
            return Err(ValidationError::field_error(field, message));
        }
        Ok(())
    }

    pub fn not_empty(value: &str, field: &str) -> ValidationResult<()> {
        Self::not_empty_with_message(value, field, None)
    }

    pub fn not_empty_with_message(
        value: &str,
        field: &str,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        if value.is_empty() {
            let message = message_or(custom_message, || format!("{} must not be empty", field));
            return Err(ValidationError::field_error(field, message));
        }
        Ok(())
    }

    /// 验证字符串非空白（仅含空白字符也视为空白）
    pub fn not_blank(value: &str, field: &str) -> ValidationResult<()> {
        Self::not_blank_with_message(value, field, None)
    }

    pub fn not_blank_with_message(
        value: &str,
        field: &str,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        if value.trim().is_empty() {
            let message = message_or(custom_message, || format!("{} must not be blank", field));
            return Err(ValidationError::field_error(field, message));
        }
        Ok(())
    }

    /// 验证字符串长度，按字符计数
    pub fn length(
        value: &str,
        field: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> ValidationResult<()> {
        Self::length_with_message(value, field, min, max, None)
    }

    pub fn length_with_message(
        value: &str,
        field: &str,
        min: Option<usize>,
        max: Option<usize>,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        let len = value.chars().count();

        if let Some(min_len) = min {
            if len < min_len {
                let message = message_or(custom_message, || {
                    format!("{} length must be at least {}, but was {}", field, min_len, len)
                });
                return Err(ValidationError::field_error(field, message));
            }
        }

        if let Some(max_len) = max {
            if len > max_len {
                let message = message_or(custom_message, || {
                    format!("{} length must be at most {}, but was {}", field, max_len, len)
                });
                return Err(ValidationError::field_error(field, message));
            }
        }

        Ok(())
    }

    pub fn range<T: PartialOrd + Display>(
        value: T,
        field: &str,
        min: Option<T>,
        max: Option<T>,
    ) -> ValidationResult<()> {
        Self::range_with_message(value, field, min, max, None)
    }

    pub fn range_with_message<T: PartialOrd + Display>(
        value: T,
        field: &str,
        min: Option<T>,
        max: Option<T>,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        if let Some(min_val) = &min {
            if &value < min_val {
                let message = message_or(custom_message, || {
                    format!("{} must be at least {}, but was {}", field, min_val, value)
                });
                return Err(ValidationError::field_error(field, message));
            }
        }

        if let Some(max_val) = &max {
            if &value > max_val {
                let message = message_or(custom_message, || {
                    format!("{} must be at most {}, but was {}", field, max_val, value)
                });
                return Err(ValidationError::field_error(field, message));
            }
        }

        Ok(())
    }

    pub fn email(value: &str, field: &str) -> ValidationResult<()> {
        Self::email_with_message(value, field, None)
    }

    pub fn email_with_message(
        value: &str,
        field: &str,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        if !EMAIL_REGEX.is_match(value) {
            let message = message_or(custom_message, || {
                format!("{} must be a valid email address", field)
            });
            return Err(ValidationError::field_error(field, message));
        }
        Ok(())
    }

    pub fn pattern(value: &str, field: &str, pattern: &str) -> ValidationResult<()> {
        Self::pattern_with_message(value, field, pattern, None)
    }

    /// 验证正则表达式，表达式本身非法时同样记为该字段的错误
    pub fn pattern_with_message(
        value: &str,
        field: &str,
        pattern: &str,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        let regex = Regex::new(pattern).map_err(|e| {
            ValidationError::field_error(field, format!("{} has an invalid pattern: {}", field, e))
        })?;

        if !regex.is_match(value) {
            let message = message_or(custom_message, || {
                format!("{} must match pattern: {}", field, pattern)
            });
            return Err(ValidationError::field_error(field, message));
        }
        Ok(())
    }

    pub fn size<T>(
        value: &[T],
        field: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> ValidationResult<()> {
        Self::size_with_message(value, field, min, max, None)
    }

    pub fn size_with_message<T>(
        value: &[T],
        field: &str,
        min: Option<usize>,
        max: Option<usize>,
        custom_message: Option<&str>,
    ) -> ValidationResult<()> {
        let len = value.len();

        if let Some(min_size) = min {
            if len < min_size {
                let message = message_or(custom_message, || {
                    format!("{} size must be at least {}, but was {}", field, min_size, len)
                });
                return Err(ValidationError::field_error(field, message));
            }
        }

        if let Some(max_size) = max {
            if len > max_size {
                let message = message_or(custom_message, || {
                    format!("{} size must be at most {}, but was {}", field, max_size, len)
                });
                return Err(ValidationError::field_error(field, message));
            }
        }

        Ok(())
    }
}

/// 验证结果收集器
///
/// 按字段声明顺序收集错误；一个字段第一次失败后，该字段后续规则的结果被忽略
#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    errors: Option<ValidationError>,
}

impl ValidatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        match &mut self.errors {
            Some(errors) => errors.add_field_error(field, message),
            None => self.errors = Some(ValidationError::field_error(field, message)),
        }
    }

    pub fn add_result(&mut self, result: ValidationResult<()>) {
        match result {
            Ok(()) => {}
            Err(error @ ValidationError::FieldErrors(_)) => match &mut self.errors {
                Some(errors) => errors.merge(error),
                None => self.errors = Some(error),
            },
            Err(other) => self.add_error("", other.message()),
        }
    }

    pub fn build(self) -> ValidationResult<()> {
        match self.errors {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }
}
