// banana-core: Banana Web 层的基础设施
//
// 提供 Web 层与 CLI 共用的基础能力：
// - 分层配置（TOML 文件、环境变量、内存配置源）
// - 基于 tracing 的日志初始化
// - 统一的应用错误类型
// - 运行模式（开发 / 生产）

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// 重新导出常用类型
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use error::{ApplicationError, ApplicationResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use runtime::RuntimeMode;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::config::{
        self, ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource,
        PropertySource, TomlPropertySource,
    };
    pub use crate::error::{ApplicationError, ApplicationResult, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::runtime::RuntimeMode;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
