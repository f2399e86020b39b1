//! # Banana Web
//!
//! 基于 Axum 的控制器层
//!
//! ## 核心特性
//!
//! - **显式注册** - 控制器把基础路径、路由和校验绑定登记到 `ControllerRegistry`
//! - **请求校验** - 处理函数执行前按声明的 schema 校验 body / query / params / headers
//! - **统一响应** - 固定的响应与错误分类，全部渲染为 JSON 信封
//! - **错误中间件** - 处理函数的错误与 panic 统一映射，非开发模式不泄露原始错误信息

pub mod app;
pub mod application;
pub mod constants;
pub mod error;
pub mod error_handler;
pub mod extract;
pub mod middleware;
pub mod registry;
pub mod response;
pub mod server;
pub mod validation;

pub use app::BananaApp;
pub use application::BananaApplication;
pub use error::{ApiError, ErrorKind, RegistryError, RegistryResult, GENERIC_ERROR_MESSAGE};
pub use registry::{Controller, ControllerRegistry, HttpMethod, RouteDescriptor};
pub use response::{ApiResponse, ResponseCategory, ResponseEnvelope};

pub mod prelude {
    //! 预导入模块

    pub use crate::app::*;
    pub use crate::application::*;
    pub use crate::error::*;
    pub use crate::error_handler::*;
    pub use crate::extract::RequestExt;
    pub use crate::middleware::*;
    pub use crate::registry::*;
    pub use crate::response::*;
    pub use crate::server::*;
    pub use crate::validation::{RequestValidator, SchemaValidator, ValidationSource};

    pub use banana_core::prelude::*;
    pub use banana_validator::{Validate, ValidationOptions};

    pub use async_trait::async_trait;
    pub use axum;
    pub use axum::extract::Request;
    pub use axum::http::StatusCode;
    pub use axum::response::{IntoResponse, Response};
    pub use std::sync::Arc;
}
