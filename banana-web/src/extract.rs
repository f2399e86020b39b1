//! 处理函数中读取请求数据的辅助方法
//!
//! 处理函数接收完整的 `Request`。解析失败统一转换为 `BadRequest` 的 `ApiError`，
//! 由错误中间件渲染。

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Path, Query, Request},
    Json, RequestExt as _,
};
use serde::de::DeserializeOwned;

#[async_trait]
pub trait RequestExt: Sized {
    /// 路径参数
    async fn path_params<T>(&mut self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static;

    /// 查询参数
    fn query_params<T: DeserializeOwned>(&self) -> Result<T, ApiError>;

    /// JSON 请求体（消耗请求）
    async fn json_body<T>(self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static;

    /// 请求头的字符串值
    fn header_value(&self, name: &str) -> Option<&str>;
}

#[async_trait]
impl RequestExt for Request {
    async fn path_params<T>(&mut self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.extract_parts::<Path<T>>()
            .await
            .map(|Path(params)| params)
            .map_err(|e| ApiError::bad_request(e.body_text()))
    }

    fn query_params<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Query::<T>::try_from_uri(self.uri())
            .map(|Query(query)| query)
            .map_err(|e| ApiError::bad_request(e.body_text()))
    }

    async fn json_body<T>(self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Json::<T>::from_request(self, &())
            .await
            .map(|Json(body)| body)
            .map_err(|e| ApiError::bad_request(e.body_text()))
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }
}
