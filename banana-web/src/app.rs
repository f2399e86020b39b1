//! 应用装配
//!
//! `BananaApp` 读取 `ControllerRegistry`，按给定顺序实例化控制器，
//! 为每个控制器生成子路由并合并到应用路由中。

use crate::error::{RegistryError, RegistryResult};
use crate::error_handler::ErrorMapper;
use crate::middleware::{error_middleware, forward_error, request_logging, RouteMiddleware};
use crate::registry::{check_path, ControllerInstance, ControllerRegistry, ErasedHandler, HttpMethod};
use crate::response::ApiResponse;
use crate::server::ServerProperties;
use crate::validation::{self, RequestValidator};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::on,
    Router,
};
use banana_core::RuntimeMode;
use futures_util::FutureExt;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// 拼接基础路径与子路径，子路径 `/` 对应基础路径本身
pub fn join_paths(base: &str, sub: &str) -> String {
    let base = base.trim_end_matches('/');
    match (base.is_empty(), sub) {
        (true, _) => sub.to_string(),
        (false, "/") => base.to_string(),
        (false, _) => format!("{}{}", base, sub),
    }
}

/// 路径形状：参数段只保留前缀，用于检测互相冲突的路由
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                ":"
            } else if segment.starts_with('*') {
                "*"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

struct MountedController {
    type_id: TypeId,
    type_name: &'static str,
    instance: ControllerInstance,
}

/// 已编译的路由：中间件、校验器和处理函数
struct CompiledRoute {
    controller: &'static str,
    handler_id: String,
    instance: ControllerInstance,
    handler: ErasedHandler,
    middlewares: Vec<Arc<dyn RouteMiddleware>>,
    validators: Vec<Arc<dyn RequestValidator>>,
    body_limit: usize,
}

impl CompiledRoute {
    /// 处理函数返回的错误和 panic 都转发给错误中间件
    async fn dispatch(self: Arc<Self>, req: Request) -> Response {
        match AssertUnwindSafe(self.run(req)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => forward_error(error),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, "Handler panicked");
                forward_error(anyhow::anyhow!(message))
            }
        }
    }

    async fn run(&self, mut req: Request) -> anyhow::Result<Response> {
        for middleware in &self.middlewares {
            middleware.pre_handle(&mut req).await?;
        }

        let req = match validation::enforce(&self.validators, req, self.body_limit).await {
            Ok(req) => req,
            Err(rejection) => return Ok(rejection),
        };

        tracing::debug!(
            controller = self.controller,
            handler = %self.handler_id,
            "Dispatching request"
        );
        let mut response = (self.handler)(self.instance.clone(), req).await?;

        for middleware in self.middlewares.iter().rev() {
            middleware.post_handle(&mut response).await?;
        }
        Ok(response)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic occurred".to_string()
    }
}

async fn not_found(method: Method, req: Request) -> Response {
    ApiResponse::not_found()
        .with_message(format!("Cannot {} {}", method, req.uri().path()))
        .into_response()
}

/// Banana 应用
///
/// ```rust,ignore
/// let mut registry = ControllerRegistry::new();
/// registry.register::<UserController>()?;
///
/// let router = BananaApp::new(registry)
///     .runtime_mode(RuntimeMode::Development)
///     .controller::<UserController>()
///     .build()?;
/// ```
pub struct BananaApp {
    registry: ControllerRegistry,
    controllers: Vec<MountedController>,
    mode: RuntimeMode,
    properties: ServerProperties,
}

impl BananaApp {
    pub fn new(registry: ControllerRegistry) -> Self {
        Self {
            registry,
            controllers: Vec::new(),
            mode: RuntimeMode::default(),
            properties: ServerProperties::default(),
        }
    }

    pub fn runtime_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn properties(mut self, properties: ServerProperties) -> Self {
        self.properties = properties;
        self
    }

    /// 挂载控制器，实例通过 `Default` 创建
    pub fn controller<C: Default + Send + Sync + 'static>(self) -> Self {
        self.controller_instance(C::default())
    }

    /// 挂载已经创建好的控制器实例
    pub fn controller_instance<C: Send + Sync + 'static>(mut self, controller: C) -> Self {
        self.controllers.push(MountedController {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            instance: Arc::new(controller),
        });
        self
    }

    /// 生成路由
    ///
    /// 未注册的路径和已注册路径上未声明的方法都返回 JSON 404 信封。
    /// 控制器缺少元数据或基础路径时返回 `MissingBasePath`；
    /// 拼接后的完整路径无法路由时返回 `InvalidPath`；
    /// 两条路由解析到同一个 (方法, 路径)，或参数名不同的同形路径，返回 `ConflictingRoute`
    pub fn build(self) -> RegistryResult<Router> {
        let mut router = Router::new();
        // 路径形状 -> (完整路径, 控制器)
        let mut shapes: HashMap<String, (String, &'static str)> = HashMap::new();
        // (方法, 完整路径) -> 控制器
        let mut endpoints: HashMap<(HttpMethod, String), &'static str> = HashMap::new();

        for mounted in &self.controllers {
            let missing = || RegistryError::MissingBasePath {
                controller: mounted.type_name.to_string(),
            };
            let metadata = self
                .registry
                .metadata_by_id(&mounted.type_id)
                .ok_or_else(missing)?;
            let base_path = metadata.base_path().ok_or_else(missing)?;
            let bindings = self.registry.bindings_by_id(&mounted.type_id);

            for binding in bindings {
                if !metadata
                    .routes()
                    .any(|route| route.handler_id == binding.handler_id)
                {
                    tracing::warn!(
                        controller = mounted.type_name,
                        handler = %binding.handler_id,
                        source = %binding.source,
                        "Validation binding refers to an unknown handler"
                    );
                }
            }

            let mut controller_router = Router::new();
            for route in &metadata.routes {
                let descriptor = &route.descriptor;
                let full_path = join_paths(base_path, &descriptor.path);
                check_path(&full_path)?;

                let shape = path_shape(&full_path);
                if let Some((existing, owner)) = shapes.get(&shape) {
                    if existing != &full_path {
                        return Err(RegistryError::ConflictingRoute {
                            method: descriptor.method.to_string(),
                            path: full_path,
                            first: format!("{} ({})", owner, existing),
                            second: mounted.type_name.to_string(),
                        });
                    }
                }
                shapes.insert(shape, (full_path.clone(), mounted.type_name));

                if let Some(owner) =
                    endpoints.insert((descriptor.method, full_path.clone()), mounted.type_name)
                {
                    return Err(RegistryError::ConflictingRoute {
                        method: descriptor.method.to_string(),
                        path: full_path,
                        first: owner.to_string(),
                        second: mounted.type_name.to_string(),
                    });
                }

                let validators = bindings
                    .iter()
                    .filter(|b| b.handler_id == descriptor.handler_id)
                    .map(|b| b.validator.clone())
                    .collect();

                let compiled = Arc::new(CompiledRoute {
                    controller: mounted.type_name,
                    handler_id: descriptor.handler_id.clone(),
                    instance: mounted.instance.clone(),
                    handler: route.handler.clone(),
                    middlewares: descriptor.middlewares.clone(),
                    validators,
                    body_limit: self.properties.max_body_size,
                });

                tracing::debug!(
                    method = %descriptor.method,
                    path = %full_path,
                    controller = mounted.type_name,
                    handler = %descriptor.handler_id,
                    "Mapped route"
                );

                controller_router = controller_router.route(
                    &full_path,
                    on(descriptor.method.filter(), move |req: Request| {
                        let compiled = compiled.clone();
                        async move { compiled.dispatch(req).await }
                    }),
                );
            }

            router = router.merge(controller_router);
            tracing::info!(
                controller = mounted.type_name,
                base_path,
                routes = metadata.routes.len(),
                "Controller mounted"
            );
        }

        let mapper = Arc::new(ErrorMapper::new(self.mode.clone()));
        let mut router = router
            .fallback(not_found)
            .method_not_allowed_fallback(not_found)
            .layer(DefaultBodyLimit::max(self.properties.max_body_size))
            .layer(from_fn_with_state(mapper, error_middleware));

        if self.properties.enable_request_logging {
            router = router.layer(from_fn(request_logging));
        }
        if self.properties.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, GENERIC_ERROR_MESSAGE};
    use crate::registry::{Controller, RouteDescriptor};
    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode};
    use banana_validator::{Validate, ValidationOptions};
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct ListQuery {
        #[validate(range(min = 1))]
        page: Option<u32>,
        #[validate(range(min = 1, max = 100))]
        limit: Option<u32>,
    }

    #[derive(Default)]
    struct UserController;

    impl UserController {
        async fn list(self: Arc<Self>, req: Request) -> anyhow::Result<ApiResponse> {
            let query = req.uri().query().unwrap_or_default().to_string();
            Ok(ApiResponse::ok(format!("list {}", query)))
        }

        async fn get(self: Arc<Self>, req: Request) -> anyhow::Result<ApiResponse> {
            Ok(ApiResponse::ok(format!("get {}", req.uri().path())))
        }

        async fn create(self: Arc<Self>, _req: Request) -> Result<ApiResponse, ApiError> {
            Err(ApiError::conflict("User already exists"))
        }

        async fn broken(self: Arc<Self>, _req: Request) -> anyhow::Result<ApiResponse> {
            Err(anyhow::anyhow!("db connection refused"))
        }

        async fn explode(self: Arc<Self>, _req: Request) -> anyhow::Result<ApiResponse> {
            panic!("boom")
        }
    }

    struct RequireToken;

    #[async_trait]
    impl RouteMiddleware for RequireToken {
        fn name(&self) -> &str {
            "RequireToken"
        }

        async fn pre_handle(&self, request: &mut Request) -> anyhow::Result<()> {
            if request.headers().contains_key("authorization") {
                Ok(())
            } else {
                Err(ApiError::unauthorized("Missing token").into())
            }
        }
    }

    impl Controller for UserController {
        fn register(registry: &mut ControllerRegistry) -> RegistryResult<()> {
            registry
                .controller::<Self>("/users")?
                .get("/list", "list", Self::list)?
                .get("/:id", "get", Self::get)?
                .post("/", "create", Self::create)?
                .get("/broken/now", "broken", Self::broken)?
                .get("/explode/now", "explode", Self::explode)?
                .route_with(
                    RouteDescriptor::new(HttpMethod::Delete, "/:id", "remove")
                        .middleware(Arc::new(RequireToken)),
                    Self::get,
                )?
                .query::<ListQuery>("list", ValidationOptions::new().skip_missing_properties(true))?;
            Ok(())
        }
    }

    fn app(mode: RuntimeMode) -> Router {
        let mut registry = ControllerRegistry::new();
        registry.register::<UserController>().unwrap();
        BananaApp::new(registry)
            .runtime_mode(mode)
            .controller::<UserController>()
            .build()
            .unwrap()
    }

    async fn call(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let req = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/users", "/"), "/users");
        assert_eq!(join_paths("/users/", "/list"), "/users/list");
        assert_eq!(join_paths("/", "/list"), "/list");
        assert_eq!(join_paths("/", "/"), "/");
    }

    #[test]
    fn test_path_shape() {
        assert_eq!(path_shape("/users/:id"), path_shape("/users/:user_id"));
        assert_ne!(path_shape("/users/list"), path_shape("/users/:id"));
    }

    #[tokio::test]
    async fn test_literal_route_before_parametric() {
        let (status, json) = call(app(RuntimeMode::Production), "GET", "/users/list").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "list ");

        let (status, json) = call(app(RuntimeMode::Production), "GET", "/users/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "get /users/7");
    }

    #[tokio::test]
    async fn test_tagged_error() {
        let (status, json) = call(app(RuntimeMode::Production), "POST", "/users").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["statusCode"], "error");
        assert_eq!(json["message"], "User already exists");
    }

    #[tokio::test]
    async fn test_untagged_error_by_mode() {
        let (status, json) = call(app(RuntimeMode::Production), "GET", "/users/broken/now").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], GENERIC_ERROR_MESSAGE);

        let (status, json) = call(app(RuntimeMode::Development), "GET", "/users/broken/now").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "db connection refused");
    }

    #[tokio::test]
    async fn test_panic_is_forwarded() {
        let (status, json) = call(app(RuntimeMode::Production), "GET", "/users/explode/now").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let (status, json) = call(app(RuntimeMode::Production), "GET", "/users/list?sort=asc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("sort"));

        let (status, json) = call(app(RuntimeMode::Production), "GET", "/users/list?page=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "list page=2");
    }

    #[tokio::test]
    async fn test_route_middleware_short_circuits() {
        let (status, json) = call(app(RuntimeMode::Production), "DELETE", "/users/7").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Missing token");

        let req = axum::http::Request::delete("/users/7")
            .header("authorization", "Bearer x")
            .body(Body::empty())
            .unwrap();
        let response = app(RuntimeMode::Production).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, json) = call(app(RuntimeMode::Production), "GET", "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Cannot GET /nowhere");
    }

    #[test]
    fn test_missing_base_path() {
        let mut registry = ControllerRegistry::new();
        registry
            .register_route::<UserController, _, _, _, _>(
                RouteDescriptor::new(HttpMethod::Get, "/list", "list"),
                UserController::list,
            )
            .unwrap();
        let err = BananaApp::new(registry)
            .controller::<UserController>()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::MissingBasePath { .. }));

        let err = BananaApp::new(ControllerRegistry::new())
            .controller::<UserController>()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::MissingBasePath { .. }));
    }

    #[derive(Default)]
    struct AccountController;

    impl AccountController {
        async fn show(self: Arc<Self>, _req: Request) -> anyhow::Result<ApiResponse> {
            Ok(ApiResponse::ok("account"))
        }
    }

    #[test]
    fn test_conflicting_routes_across_controllers() {
        let mut registry = ControllerRegistry::new();
        registry.register::<UserController>().unwrap();
        registry
            .controller::<AccountController>("/users")
            .unwrap()
            .get("/list", "show", AccountController::show)
            .unwrap();

        let err = BananaApp::new(registry)
            .controller::<UserController>()
            .controller::<AccountController>()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::ConflictingRoute { .. }));
    }

    #[test]
    fn test_conflicting_parameter_names() {
        let mut registry = ControllerRegistry::new();
        registry.register::<UserController>().unwrap();
        registry
            .controller::<AccountController>("/users")
            .unwrap()
            .put("/:user_id", "show", AccountController::show)
            .unwrap();

        let err = BananaApp::new(registry)
            .controller::<UserController>()
            .controller::<AccountController>()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::ConflictingRoute { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_method_is_json_404() {
        let (status, json) = call(app(RuntimeMode::Production), "PATCH", "/users/list").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["statusCode"], "error");
        assert_eq!(json["message"], "Cannot PATCH /users/list");
    }

    #[test]
    fn test_catch_all_base_path_with_sub_path() {
        let mut registry = ControllerRegistry::new();
        registry
            .controller::<AccountController>("/files/*rest")
            .unwrap()
            .get("/meta", "show", AccountController::show)
            .unwrap();

        let err = BananaApp::new(registry)
            .controller::<AccountController>()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::InvalidPath { .. }));
    }

    #[derive(Debug, Deserialize, Validate)]
    struct IdParams {
        #[validate(range(min = 1))]
        id: u32,
    }

    #[derive(Default)]
    struct ItemController;

    impl ItemController {
        async fn show(self: Arc<Self>, req: Request) -> anyhow::Result<ApiResponse> {
            Ok(ApiResponse::ok(format!("item {}", req.uri().path())))
        }
    }

    impl Controller for ItemController {
        fn register(registry: &mut ControllerRegistry) -> RegistryResult<()> {
            registry
                .controller::<Self>("/items")?
                .get("/:id", "show", Self::show)?
                .get("/:id/tags/:tag", "tag", Self::show)?
                .params::<IdParams>("show", ValidationOptions::new())?
                .params::<IdParams>("tag", ValidationOptions::new())?;
            Ok(())
        }
    }

    fn item_app() -> Router {
        let mut registry = ControllerRegistry::new();
        registry.register::<ItemController>().unwrap();
        BananaApp::new(registry)
            .controller::<ItemController>()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_path_param_validation() {
        let (status, json) = call(item_app(), "GET", "/items/5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "item /items/5");

        let (status, json) = call(item_app(), "GET", "/items/0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["statusCode"], "error");
        assert_eq!(json["message"], "id must be at least 1, but was 0");

        let (status, json) = call(item_app(), "GET", "/items/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn test_undeclared_path_param_rejected() {
        let (status, json) = call(item_app(), "GET", "/items/5/tags/red").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "property tag should not exist");
    }
}
