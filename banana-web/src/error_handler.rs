//! 错误映射
//!
//! 把处理链路中产生的错误转换为 JSON 信封：
//!
//! 1. 带分类的 `ApiError`：使用分类对应的状态码与错误自身的消息，`InternalError` 额外记录日志
//! 2. 其他错误：总是记录日志并返回 500；只有开发模式会把原始错误信息返回给调用方

use crate::error::{ApiError, ErrorKind, GENERIC_ERROR_MESSAGE};
use crate::response::{ResponseCategory, ResponseEnvelope};
use axum::{
    extract::{ConnectInfo, Request},
    response::{IntoResponse, Response},
};
use banana_core::RuntimeMode;
use std::net::SocketAddr;

/// 记录错误日志所需的请求信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
    pub client: String,
}

impl RequestInfo {
    pub fn from_request(req: &Request) -> Self {
        let client = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            method: req.method().to_string(),
            url: req.uri().to_string(),
            client,
        }
    }
}

/// 错误映射器
#[derive(Debug, Clone, Default)]
pub struct ErrorMapper {
    mode: RuntimeMode,
}

impl ErrorMapper {
    pub fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> &RuntimeMode {
        &self.mode
    }

    /// 把错误映射为信封
    pub fn map_error(&self, error: &anyhow::Error, info: &RequestInfo) -> ResponseEnvelope {
        match error.downcast_ref::<ApiError>() {
            Some(api_error) => {
                let kind = api_error.kind();
                if kind == ErrorKind::InternalError {
                    log_failure(kind.name(), api_error.message(), info);
                } else {
                    tracing::debug!(
                        error = kind.name(),
                        status = kind.category().status().as_u16(),
                        url = %info.url,
                        "{}",
                        api_error.message()
                    );
                }
                ResponseEnvelope::without_data(api_error.kind().category(), api_error.message())
            }
            None => {
                log_failure("UnhandledError", &error.to_string(), info);
                let message = if self.mode.is_development() {
                    error.to_string()
                } else {
                    GENERIC_ERROR_MESSAGE.to_string()
                };
                ResponseEnvelope::without_data(ResponseCategory::InternalError, message)
            }
        }
    }

    pub fn respond(&self, error: &anyhow::Error, info: &RequestInfo) -> Response {
        self.map_error(error, info).into_response()
    }
}

fn log_failure(name: &str, message: &str, info: &RequestInfo) {
    tracing::error!(
        error = name,
        status = 500,
        url = %info.url,
        method = %info.method,
        client = %info.client,
        "{}",
        message
    );
}
