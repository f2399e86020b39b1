//! 框架配置常量定义
//!
//! 定义所有框架使用的配置键名称

// ==================== Server 配置 ====================

/// 服务器监听地址
pub const SERVER_HOST: &str = "server.host";

/// 服务器监听端口
pub const SERVER_PORT: &str = "server.port";

/// 请求体大小上限（字节）
pub const SERVER_MAX_BODY_SIZE: &str = "server.max-body-size";

/// 是否启用 CORS
pub const SERVER_ENABLE_CORS: &str = "server.enable-cors";

/// 是否启用请求日志
pub const SERVER_ENABLE_REQUEST_LOGGING: &str = "server.enable-request-logging";

// ==================== 运行模式 ====================

/// 运行模式（`development` 时回显未分类错误的原始信息）
pub use banana_core::runtime::RUNTIME_MODE_KEY;

// ==================== 默认值 ====================

pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 8080;

/// 默认请求体大小上限：2 MiB
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;
