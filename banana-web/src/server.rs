//! Web 服务器模块
//!
//! 基于 Axum 的 Web 服务器实现

use crate::constants::*;
use axum::Router;
use banana_core::prelude::*;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Web 服务器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    /// 服务器监听地址
    pub host: String,

    /// 服务器监听端口
    pub port: u16,

    /// 请求体大小上限（字节），校验请求体与 JSON 提取共用
    pub max_body_size: usize,

    /// 是否启用 CORS
    pub enable_cors: bool,

    /// 是否启用请求日志
    pub enable_request_logging: bool,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            enable_cors: false,
            enable_request_logging: true,
        }
    }
}

impl ServerProperties {
    /// 从 Environment 加载配置，非法的端口与大小退回默认值
    pub fn from_environment(env: &Environment) -> Self {
        let port = env
            .get_i64(SERVER_PORT)
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_PORT);
        let max_body_size = env
            .get_i64(SERVER_MAX_BODY_SIZE)
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_MAX_BODY_SIZE);

        Self {
            host: env.get_string_or(SERVER_HOST, DEFAULT_HOST),
            port,
            max_body_size,
            enable_cors: env.get_bool_or(SERVER_ENABLE_CORS, false),
            enable_request_logging: env.get_bool_or(SERVER_ENABLE_REQUEST_LOGGING, true),
        }
    }

    /// 获取服务器地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Banana Web 服务器
pub struct BananaServer {
    properties: ServerProperties,
}

impl BananaServer {
    pub fn new(properties: ServerProperties) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &ServerProperties {
        &self.properties
    }

    /// 启动服务器，收到 Ctrl-C 后优雅退出
    pub async fn serve(self, router: Router) -> ApplicationResult<()> {
        let addr = self.properties.address();

        tracing::info!("Starting Banana web server on {}", addr);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApplicationError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("Server listening on http://{}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApplicationError::Server(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
