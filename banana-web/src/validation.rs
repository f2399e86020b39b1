//! 请求数据校验
//!
//! 处理函数绑定的 schema 在处理函数之前运行。任何一个绑定失败都会直接返回
//! 400 `BadRequest` 信封，请求不会进入处理函数，也不会经过错误中间件。

use crate::response::ApiResponse;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Path, Query, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use banana_validator::{
    check_shape, validate_value, Schema, Validate, ValidationError, ValidationOptions,
    ValidationResult,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 校验数据的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationSource {
    Body,
    Header,
    Query,
    Param,
}

impl ValidationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationSource::Body => "body",
            ValidationSource::Header => "headers",
            ValidationSource::Query => "query",
            ValidationSource::Param => "params",
        }
    }
}

impl fmt::Display for ValidationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 请求校验器
#[async_trait]
pub trait RequestValidator: Send + Sync {
    fn source(&self) -> ValidationSource;

    /// `body` 只有在存在 body 绑定时才是完整的请求体，其余情况为空
    async fn validate(&self, parts: &mut Parts, body: &Bytes) -> ValidationResult<()>;
}

/// 基于 `Schema` 的校验器
pub struct SchemaValidator<S> {
    source: ValidationSource,
    options: ValidationOptions,
    _schema: PhantomData<fn() -> S>,
}

impl<S> SchemaValidator<S> {
    pub fn new(source: ValidationSource, options: ValidationOptions) -> Self {
        Self {
            source,
            options,
            _schema: PhantomData,
        }
    }
}

impl<S> SchemaValidator<S>
where
    S: Schema + Validate + DeserializeOwned + Send,
{
    fn validate_body(&self, body: &Bytes) -> ValidationResult<()> {
        // 空请求体按空对象处理，缺失字段交给形状检查报告
        let value = if body.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(body)
                .map_err(|e| ValidationError::new(format!("body must be valid JSON: {}", e)))?
        };
        validate_value::<S>(value, &self.options).map(|_| ())
    }

    fn validate_query(&self, parts: &Parts) -> ValidationResult<()> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|e| ValidationError::new(e.body_text()))?;
        check_shape::<S, _>(pairs.into_iter().map(|(key, _)| (key, true)), &self.options)?;

        let Query(data) =
            Query::<S>::try_from_uri(&parts.uri).map_err(|e| ValidationError::new(e.body_text()))?;
        data.validate()
    }

    async fn validate_params(&self, parts: &mut Parts) -> ValidationResult<()> {
        // 路由没有参数时按空集合处理
        let params = match Path::<HashMap<String, String>>::from_request_parts(parts, &()).await {
            Ok(Path(params)) => params,
            Err(_) => HashMap::new(),
        };
        let has_params = !params.is_empty();
        check_shape::<S, _>(params.into_keys().map(|key| (key, true)), &self.options)?;

        let data: S = if has_params {
            Path::<S>::from_request_parts(parts, &())
                .await
                .map(|Path(data)| data)
                .map_err(|e| ValidationError::new(e.body_text()))?
        } else {
            serde_json::from_value(Value::Object(Map::new()))
                .map_err(|e| ValidationError::new(e.to_string()))?
        };
        data.validate()
    }

    fn validate_headers(&self, parts: &Parts) -> ValidationResult<()> {
        // 请求头总是包含大量与 schema 无关的项，只取声明过的字段
        let mut values = Map::new();
        for field in S::fields() {
            if let Some(value) = parts.headers.get(field.name) {
                let value = value.to_str().map_err(|_| {
                    ValidationError::field_error(
                        field.name,
                        format!("{} must be a visible ASCII string", field.name),
                    )
                })?;
                values.insert(field.name.to_string(), Value::String(value.to_string()));
            }
        }
        let options = self.options.forbid_unknown_fields(false);
        validate_value::<S>(Value::Object(values), &options).map(|_| ())
    }
}

#[async_trait]
impl<S> RequestValidator for SchemaValidator<S>
where
    S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
{
    fn source(&self) -> ValidationSource {
        self.source
    }

    async fn validate(&self, parts: &mut Parts, body: &Bytes) -> ValidationResult<()> {
        match self.source {
            ValidationSource::Body => self.validate_body(body),
            ValidationSource::Query => self.validate_query(parts),
            ValidationSource::Param => self.validate_params(parts).await,
            ValidationSource::Header => self.validate_headers(parts),
        }
    }
}

/// 校验失败的响应
pub fn rejection(error: &ValidationError) -> Response {
    ApiResponse::bad_request()
        .with_message(error.message())
        .into_response()
}

/// 按绑定顺序运行校验器，全部通过后返回原请求（请求体原样恢复）
pub(crate) async fn enforce(
    validators: &[Arc<dyn RequestValidator>],
    req: Request,
    body_limit: usize,
) -> Result<Request, Response> {
    if validators.is_empty() {
        return Ok(req);
    }

    let (mut parts, body) = req.into_parts();
    let needs_body = validators
        .iter()
        .any(|v| v.source() == ValidationSource::Body);

    let (bytes, body) = if needs_body {
        let bytes = to_bytes(body, body_limit).await.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            rejection(&ValidationError::new("Failed to read request body"))
        })?;
        (bytes.clone(), Body::from(bytes))
    } else {
        (Bytes::new(), body)
    };

    for validator in validators {
        if let Err(error) = validator.validate(&mut parts, &bytes).await {
            tracing::debug!(
                source = %validator.source(),
                uri = %parts.uri,
                error = %error,
                "Request validation failed"
            );
            return Err(rejection(&error));
        }
    }

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use banana_validator::Validate;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct ListQuery {
        #[validate(range(min = 1))]
        page: Option<u32>,
        #[validate(range(min = 1, max = 100))]
        limit: Option<u32>,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct CreateUser {
        #[validate(not_blank)]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct ApiKeyHeader {
        #[serde(rename = "x-api-key")]
        #[validate(length(min = 8))]
        api_key: String,
    }

    fn validator<S>(source: ValidationSource, skip: bool) -> Arc<dyn RequestValidator>
    where
        S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
    {
        Arc::new(SchemaValidator::<S>::new(
            source,
            ValidationOptions::new().skip_missing_properties(skip),
        ))
    }

    async fn message_of(response: Response) -> String {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["statusCode"], "error");
        json["message"].as_str().unwrap().to_string()
    }

    fn get(uri: &str) -> Request {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_no_bindings_pass_through() {
        assert!(enforce(&[], get("/users?anything=1"), 1024).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_unknown_field() {
        let validators = [validator::<ListQuery>(ValidationSource::Query, true)];
        let response = enforce(&validators, get("/users?page=1&sort=asc"), 1024)
            .await
            .unwrap_err();
        assert_eq!(message_of(response).await, "property sort should not exist");
    }

    #[tokio::test]
    async fn test_query_missing_field_depends_on_options() {
        let strict = [validator::<ListQuery>(ValidationSource::Query, false)];
        let response = enforce(&strict, get("/users?page=1"), 1024)
            .await
            .unwrap_err();
        assert!(message_of(response).await.contains("limit"));

        let lenient = [validator::<ListQuery>(ValidationSource::Query, true)];
        assert!(enforce(&lenient, get("/users?page=1"), 1024).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_rule_failure() {
        let validators = [validator::<ListQuery>(ValidationSource::Query, true)];
        let response = enforce(&validators, get("/users?limit=500"), 1024)
            .await
            .unwrap_err();
        assert_eq!(
            message_of(response).await,
            "limit must be at most 100, but was 500"
        );
    }

    #[tokio::test]
    async fn test_body_is_restored_after_validation() {
        let validators = [validator::<CreateUser>(ValidationSource::Body, false)];
        let payload = r#"{"name":"alice","email":"alice@example.com"}"#;
        let req = axum::http::Request::post("/users")
            .header("content-type", "application/json")
            .body(Body::from(payload))
            .unwrap();

        let req = enforce(&validators, req, 1024).await.unwrap();
        let bytes = to_bytes(req.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, payload.as_bytes());
    }

    #[tokio::test]
    async fn test_body_failures_joined() {
        let validators = [validator::<CreateUser>(ValidationSource::Body, false)];
        let req = axum::http::Request::post("/users")
            .body(Body::from(r#"{"name":" ","email":"nope","role":"admin"}"#))
            .unwrap();
        let response = enforce(&validators, req, 1024).await.unwrap_err();
        assert_eq!(
            message_of(response).await,
            "property role should not exist"
        );

        let req = axum::http::Request::post("/users")
            .body(Body::from(r#"{"name":" ","email":"nope"}"#))
            .unwrap();
        let response = enforce(&validators, req, 1024).await.unwrap_err();
        assert_eq!(
            message_of(response).await,
            "name must not be blank, email must be a valid email address"
        );
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let validators = [validator::<CreateUser>(ValidationSource::Body, false)];
        let req = axum::http::Request::post("/users")
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();
        let response = enforce(&validators, req, 16).await.unwrap_err();
        assert_eq!(message_of(response).await, "Failed to read request body");
    }

    #[tokio::test]
    async fn test_headers_ignore_undeclared() {
        let validators = [validator::<ApiKeyHeader>(ValidationSource::Header, false)];
        let req = axum::http::Request::get("/users")
            .header("x-api-key", "0123456789")
            .header("user-agent", "curl")
            .body(Body::empty())
            .unwrap();
        assert!(enforce(&validators, req, 1024).await.is_ok());

        let response = enforce(&validators, get("/users"), 1024).await.unwrap_err();
        assert_eq!(message_of(response).await, "x-api-key must not be null");
    }

    #[tokio::test]
    async fn test_first_failing_binding_wins() {
        let validators = [
            validator::<ApiKeyHeader>(ValidationSource::Header, false),
            validator::<ListQuery>(ValidationSource::Query, true),
        ];
        let response = enforce(&validators, get("/users?sort=asc"), 1024)
            .await
            .unwrap_err();
        assert_eq!(message_of(response).await, "x-api-key must not be null");
    }
}
