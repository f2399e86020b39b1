use thiserror::Error;

/// 统一的错误处理类型
///
/// 业务代码（包括控制器处理函数）使用 anyhow::Result，
/// 通过 .context() 方法添加错误上下文信息。
///
/// # 示例
///
/// ```rust,ignore
/// use anyhow::{Context, Result};
///
/// fn load_user(&self, id: u32) -> Result<User> {
///     self.users.get(&id)
///         .cloned()
///         .ok_or_else(|| anyhow::anyhow!("User not found"))
///         .context(format!("Failed to load user '{}'", id))
/// }
/// ```
pub use anyhow::Result;

/// 应用启动与运行阶段的错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 日志系统初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 配置错误（配置文件解析失败、路由表不合法等）
    #[error("Configuration error: {0}")]
    Config(String),

    /// 服务器错误（端口绑定失败、服务异常退出）
    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;
