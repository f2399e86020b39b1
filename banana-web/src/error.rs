//! Web 层错误类型
//!
//! - `ApiError`：处理函数返回的带分类错误，映射为固定状态码的 JSON 信封
//! - `RegistryError`：注册与启动阶段的配置错误

use crate::response::ResponseCategory;
use banana_core::ApplicationError;
use thiserror::Error;

/// 未分类错误在非开发模式下返回的通用消息
pub const GENERIC_ERROR_MESSAGE: &str = "Something wrong happened.";

/// 错误分类（成功以外的 11 种响应分类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    InternalError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::BadRequest,
        ErrorKind::Unauthorized,
        ErrorKind::PaymentRequired,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::TooManyRequests,
        ErrorKind::InternalError,
        ErrorKind::BadGateway,
        ErrorKind::ServiceUnavailable,
        ErrorKind::GatewayTimeout,
    ];

    pub fn category(&self) -> ResponseCategory {
        match self {
            ErrorKind::BadRequest => ResponseCategory::BadRequest,
            ErrorKind::Unauthorized => ResponseCategory::Unauthorized,
            ErrorKind::PaymentRequired => ResponseCategory::PaymentRequired,
            ErrorKind::Forbidden => ResponseCategory::Forbidden,
            ErrorKind::NotFound => ResponseCategory::NotFound,
            ErrorKind::Conflict => ResponseCategory::Conflict,
            ErrorKind::TooManyRequests => ResponseCategory::TooManyRequests,
            ErrorKind::InternalError => ResponseCategory::InternalError,
            ErrorKind::BadGateway => ResponseCategory::BadGateway,
            ErrorKind::ServiceUnavailable => ResponseCategory::ServiceUnavailable,
            ErrorKind::GatewayTimeout => ResponseCategory::GatewayTimeout,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorised",
            ErrorKind::PaymentRequired => "Payment Required",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::TooManyRequests => "Too Many Requests",
            ErrorKind::InternalError => "Internal Server Error",
            ErrorKind::BadGateway => "Bad Gateway",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
            ErrorKind::GatewayTimeout => "Gateway Timeout",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequestError",
            ErrorKind::Unauthorized => "UnauthorisedError",
            ErrorKind::PaymentRequired => "PaymentRequiredError",
            ErrorKind::Forbidden => "ForbiddenError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::TooManyRequests => "TooManyRequestsError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::BadGateway => "BadGatewayError",
            ErrorKind::ServiceUnavailable => "ServiceUnavailableError",
            ErrorKind::GatewayTimeout => "GatewayTimeoutError",
        }
    }
}

/// 带分类的业务错误
///
/// 处理函数返回 `anyhow::Result`，错误中的 `ApiError` 会被错误中间件识别
/// （包括经过 `.context()` 包装的情况）。
///
/// ```rust,ignore
/// let user = self.find(id).ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 使用分类默认消息
    pub fn of(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PaymentRequired, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GatewayTimeout, message)
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self::of(kind)
    }
}

/// 控制器注册与启动阶段的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("controller {controller} has no base path; register it before building the app")]
    MissingBasePath { controller: String },

    #[error("controller {controller} is already registered at {existing}, cannot re-register at {requested}")]
    BasePathConflict {
        controller: String,
        existing: String,
        requested: String,
    },

    #[error("controller {controller} already declares {method} {path}")]
    DuplicateRoute {
        controller: String,
        method: String,
        path: String,
    },

    #[error("handler {handler} of controller {controller} already has a {source_name} validation binding")]
    DuplicateBinding {
        controller: String,
        handler: String,
        source_name: String,
    },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{method} {path} is declared by both {first} and {second}")]
    ConflictingRoute {
        method: String,
        path: String,
        first: String,
        second: String,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<RegistryError> for ApplicationError {
    fn from(error: RegistryError) -> Self {
        ApplicationError::Config(error.to_string())
    }
}
