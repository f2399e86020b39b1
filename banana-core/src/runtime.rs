//! 运行模式
//!
//! 运行模式决定未分类错误是否把原始错误信息返回给调用方：
//! 只有开发模式会回显，其余任何模式都只返回固定的通用提示。

use crate::config::Environment;
use std::fmt;

/// 运行模式对应的配置键（环境变量 `BANANA_ENV`）
pub const RUNTIME_MODE_KEY: &str = "env";

/// 开发模式标签
pub const DEVELOPMENT_LABEL: &str = "development";

/// 生产模式标签
pub const PRODUCTION_LABEL: &str = "production";

/// 运行模式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    /// 开发模式：未分类错误回显原始信息
    Development,

    /// 生产模式（未配置时的默认值）
    #[default]
    Production,

    /// 其他自定义标签（例如 `test`、`staging`），按非开发模式处理
    Other(String),
}

impl RuntimeMode {
    /// 从标签解析运行模式，大小写与首尾空白不敏感
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            DEVELOPMENT_LABEL => RuntimeMode::Development,
            PRODUCTION_LABEL | "" => RuntimeMode::Production,
            _ => RuntimeMode::Other(normalized),
        }
    }

    /// 从 Environment 读取运行模式，未配置时为生产模式
    pub fn from_environment(env: &Environment) -> Self {
        env.get_string(RUNTIME_MODE_KEY)
            .map(|label| Self::from_label(&label))
            .unwrap_or_default()
    }

    pub fn is_development(&self) -> bool {
        matches!(self, RuntimeMode::Development)
    }

    pub fn label(&self) -> &str {
        match self {
            RuntimeMode::Development => DEVELOPMENT_LABEL,
            RuntimeMode::Production => PRODUCTION_LABEL,
            RuntimeMode::Other(label) => label,
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigValue, MapPropertySource};

    #[test]
    fn test_from_label() {
        assert_eq!(RuntimeMode::from_label("development"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::from_label(" Development "), RuntimeMode::Development);
        assert_eq!(RuntimeMode::from_label("production"), RuntimeMode::Production);
        assert_eq!(RuntimeMode::from_label(""), RuntimeMode::Production);
        assert_eq!(
            RuntimeMode::from_label("staging"),
            RuntimeMode::Other("staging".to_string())
        );
    }

    #[test]
    fn test_only_development_is_verbose() {
        assert!(RuntimeMode::Development.is_development());
        assert!(!RuntimeMode::Production.is_development());
        assert!(!RuntimeMode::from_label("dev").is_development());
        assert!(!RuntimeMode::from_label("test").is_development());
    }

    #[test]
    fn test_from_environment() {
        let env = Environment::new();
        assert_eq!(RuntimeMode::from_environment(&env), RuntimeMode::Production);

        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property(RUNTIME_MODE_KEY, ConfigValue::String("development".into())),
        ));
        assert_eq!(RuntimeMode::from_environment(&env), RuntimeMode::Development);
    }
}
