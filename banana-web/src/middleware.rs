//! 中间件模块
//!
//! - `RouteMiddleware`：挂在单条路由上的中间件，在校验与处理函数之前按声明顺序执行
//! - `error_middleware`：终端错误中间件，把转发的错误渲染为 JSON 信封
//! - `request_logging`：请求日志

use crate::error_handler::{ErrorMapper, RequestInfo};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{sync::Arc, time::Instant};

/// 路由中间件
///
/// `pre_handle` 返回错误时请求不会到达处理函数，错误交给错误中间件处理：
///
/// ```rust,ignore
/// struct RequireToken;
///
/// #[async_trait]
/// impl RouteMiddleware for RequireToken {
///     fn name(&self) -> &str { "RequireToken" }
///
///     async fn pre_handle(&self, request: &mut Request) -> anyhow::Result<()> {
///         if request.headers().contains_key("authorization") {
///             Ok(())
///         } else {
///             Err(ApiError::unauthorized("Missing token").into())
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait RouteMiddleware: Send + Sync {
    fn name(&self) -> &str;

    /// 在处理函数之前执行，可以修改请求
    async fn pre_handle(&self, request: &mut Request) -> anyhow::Result<()>;

    /// 处理函数成功返回后执行（逆序），可以修改响应
    async fn post_handle(&self, _response: &mut Response) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 随响应扩展一起传递给错误中间件的错误
#[derive(Clone)]
pub struct ForwardedError(pub Arc<anyhow::Error>);

/// 把错误转发给错误中间件
///
/// 返回的响应本身是一个兜底的 500，错误中间件会用映射后的信封替换它
pub fn forward_error(error: anyhow::Error) -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response
        .extensions_mut()
        .insert(ForwardedError(Arc::new(error)));
    response
}

/// 终端错误中间件
pub async fn error_middleware(
    State(mapper): State<Arc<ErrorMapper>>,
    req: Request,
    next: Next,
) -> Response {
    let info = RequestInfo::from_request(&req);
    let response = next.run(req).await;

    // 响应扩展中带有转发的错误，说明处理链路中某一步失败了
    match response.extensions().get::<ForwardedError>() {
        Some(ForwardedError(error)) => mapper.respond(error, &info),
        None => response,
    }
}

/// 请求日志中间件
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        elapsed = ?start.elapsed(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Router};
    use banana_core::RuntimeMode;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_forwarded_error_is_rendered() {
        let mapper = Arc::new(ErrorMapper::new(RuntimeMode::Production));
        let app = Router::new()
            .route(
                "/teapot",
                get(|| async { forward_error(ApiError::too_many_requests("Slow down").into()) }),
            )
            .route("/ok", get(|| async { "fine" }))
            .layer(from_fn_with_state(mapper, error_middleware));

        let response = app
            .clone()
            .oneshot(axum::http::Request::get("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert_eq!(json["statusCode"], "error");
        assert_eq!(json["message"], "Slow down");

        let response = app
            .oneshot(axum::http::Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
