//! 响应分类与 JSON 信封
//!
//! 每个响应都序列化为
//! `{"statusCode": "success"|"error", "status": <u16>, "message": <string>, "data"?: <T>}`，
//! `data` 只在成功响应携带数据时出现，缺省时直接省略该键。

use axum::{
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 响应分类，状态码固定且两两不同
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCategory {
    Success,
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

impl ResponseCategory {
    pub const ALL: [ResponseCategory; 12] = [
        ResponseCategory::Success,
        ResponseCategory::BadRequest,
        ResponseCategory::Unauthorized,
        ResponseCategory::PaymentRequired,
        ResponseCategory::Forbidden,
        ResponseCategory::NotFound,
        ResponseCategory::Conflict,
        ResponseCategory::TooManyRequests,
        ResponseCategory::InternalError,
        ResponseCategory::BadGateway,
        ResponseCategory::ServiceUnavailable,
        ResponseCategory::GatewayTimeout,
    ];

    pub fn status(&self) -> StatusCode {
        match self {
            ResponseCategory::Success => StatusCode::OK,
            ResponseCategory::BadRequest => StatusCode::BAD_REQUEST,
            ResponseCategory::Unauthorized => StatusCode::UNAUTHORIZED,
            ResponseCategory::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ResponseCategory::Forbidden => StatusCode::FORBIDDEN,
            ResponseCategory::NotFound => StatusCode::NOT_FOUND,
            ResponseCategory::Conflict => StatusCode::CONFLICT,
            ResponseCategory::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ResponseCategory::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ResponseCategory::BadGateway => StatusCode::BAD_GATEWAY,
            ResponseCategory::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ResponseCategory::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// 构造响应时未给出消息所使用的默认消息
    pub fn default_message(&self) -> &'static str {
        match self {
            ResponseCategory::Success => "Success",
            ResponseCategory::BadRequest => "Bad Parameters",
            ResponseCategory::Unauthorized => "Unauthorized",
            ResponseCategory::PaymentRequired => "Payment required!",
            ResponseCategory::Forbidden => "Forbidden",
            ResponseCategory::NotFound => "Not Found",
            ResponseCategory::Conflict => "Conflict",
            ResponseCategory::TooManyRequests => "Too Many Requests",
            ResponseCategory::InternalError => "Internal Error",
            ResponseCategory::BadGateway => "Bad Gateway",
            ResponseCategory::ServiceUnavailable => "Service Unavailable",
            ResponseCategory::GatewayTimeout => "Gateway Timeout",
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            ResponseCategory::Success => Outcome::Success,
            _ => Outcome::Error,
        }
    }
}

/// 信封中的 `statusCode` 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// JSON 响应信封
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T = ()> {
    pub status_code: Outcome,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ResponseEnvelope<()> {
    /// 不携带数据的信封（所有错误响应都使用这种形式）
    pub fn without_data(category: ResponseCategory, message: impl Into<String>) -> Self {
        Self {
            status_code: category.outcome(),
            status: category.status().as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

/// 处理函数返回的响应
///
/// ```rust,ignore
/// async fn list(&self, _req: Request) -> anyhow::Result<ApiResponse<Vec<User>>> {
///     Ok(ApiResponse::success("Users fetched", self.users()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiResponse<T = ()> {
    category: ResponseCategory,
    message: String,
    data: Option<T>,
    headers: HeaderMap,
}

impl<T> ApiResponse<T> {
    /// 成功响应，携带数据
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            category: ResponseCategory::Success,
            message: message.into(),
            data: Some(data),
            headers: HeaderMap::new(),
        }
    }

    /// 追加响应头，非法的头名称或值会被忽略并记录警告
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Ignoring invalid response header"),
        }
        self
    }

    pub fn category(&self) -> ResponseCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_envelope(self) -> ResponseEnvelope<T> {
        ResponseEnvelope {
            status_code: self.category.outcome(),
            status: self.category.status().as_u16(),
            message: self.message,
            data: self.data,
        }
    }
}

impl ApiResponse<()> {
    /// 指定分类的响应，使用分类的默认消息
    pub fn of(category: ResponseCategory) -> Self {
        Self {
            category,
            message: category.default_message().to_string(),
            data: None,
            headers: HeaderMap::new(),
        }
    }

    /// 不携带数据的成功响应
    pub fn ok(message: impl Into<String>) -> Self {
        Self::of(ResponseCategory::Success).with_message(message)
    }

    pub fn bad_request() -> Self {
        Self::of(ResponseCategory::BadRequest)
    }

    pub fn unauthorized() -> Self {
        Self::of(ResponseCategory::Unauthorized)
    }

    pub fn payment_required() -> Self {
        Self::of(ResponseCategory::PaymentRequired)
    }

    pub fn forbidden() -> Self {
        Self::of(ResponseCategory::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::of(ResponseCategory::NotFound)
    }

    pub fn conflict() -> Self {
        Self::of(ResponseCategory::Conflict)
    }

    pub fn too_many_requests() -> Self {
        Self::of(ResponseCategory::TooManyRequests)
    }

    pub fn internal_error() -> Self {
        Self::of(ResponseCategory::InternalError)
    }

    pub fn bad_gateway() -> Self {
        Self::of(ResponseCategory::BadGateway)
    }

    pub fn service_unavailable() -> Self {
        Self::of(ResponseCategory::ServiceUnavailable)
    }

    pub fn gateway_timeout() -> Self {
        Self::of(ResponseCategory::GatewayTimeout)
    }

    /// 替换消息
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.category.status();
        let headers = self.headers.clone();
        let mut response = (status, Json(self.into_envelope())).into_response();
        for (name, value) in headers.iter() {
            response.headers_mut().append(name.clone(), value.clone());
        }
        response
    }
}

impl IntoResponse for ResponseEnvelope<()> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
