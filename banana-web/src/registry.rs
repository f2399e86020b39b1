//! 控制器注册表
//!
//! 控制器在启动前把基础路径、路由和校验绑定登记到一个显式的 `ControllerRegistry` 中，
//! `BananaApp::build` 读取注册表生成路由表。
//!
//! ```rust,ignore
//! impl Controller for UserController {
//!     fn register(registry: &mut ControllerRegistry) -> RegistryResult<()> {
//!         registry
//!             .controller::<Self>("/users")?
//!             .get("/list", "list", Self::list)?
//!             .get("/:id", "get", Self::get)?
//!             .query::<ListQuery>("list", ValidationOptions::new().skip_missing_properties(true))?;
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::{RegistryError, RegistryResult};
use crate::middleware::RouteMiddleware;
use crate::validation::{RequestValidator, SchemaValidator, ValidationSource};
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
    routing::MethodFilter,
};
use banana_validator::{Schema, Validate, ValidationOptions};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 类型擦除后的控制器实例
pub(crate) type ControllerInstance = Arc<dyn Any + Send + Sync>;

/// 类型擦除后的处理函数，实例在调用时向下转型为具体的控制器类型
pub(crate) type ErasedHandler =
    Arc<dyn Fn(ControllerInstance, Request) -> BoxFuture<'static, anyhow::Result<Response>> + Send + Sync>;

/// 路由描述
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: HttpMethod,
    /// 相对控制器基础路径的子路径
    pub path: String,
    pub handler_id: String,
    pub middlewares: Vec<Arc<dyn RouteMiddleware>>,
}

impl RouteDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>, handler_id: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            handler_id: handler_id.into(),
            middlewares: Vec::new(),
        }
    }

    pub fn middleware(mut self, middleware: Arc<dyn RouteMiddleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_id", &self.handler_id)
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub(crate) struct RegisteredRoute {
    pub(crate) descriptor: RouteDescriptor,
    pub(crate) handler: ErasedHandler,
}

/// 单个控制器的元数据
pub struct ControllerMetadata {
    type_name: &'static str,
    base_path: Option<String>,
    pub(crate) routes: Vec<RegisteredRoute>,
}

impl ControllerMetadata {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            base_path: None,
            routes: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// 按注册顺序返回路由
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().map(|r| &r.descriptor)
    }
}

impl fmt::Debug for ControllerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerMetadata")
            .field("type_name", &self.type_name)
            .field("base_path", &self.base_path)
            .field("routes", &self.routes().collect::<Vec<_>>())
            .finish()
    }
}

/// 校验绑定
#[derive(Clone)]
pub(crate) struct ValidationBinding {
    pub(crate) handler_id: String,
    pub(crate) source: ValidationSource,
    pub(crate) validator: Arc<dyn RequestValidator>,
}

/// 控制器注册表
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: HashMap<TypeId, ControllerMetadata>,
    bindings: HashMap<TypeId, Vec<ValidationBinding>>,
}

/// 路径必须以 `/` 开头，且不能包含查询串或片段；
/// `:name` / `*name` 参数必须有名字，通配段只能位于末尾
pub(crate) fn check_path(path: &str) -> RegistryResult<()> {
    let invalid = |reason: &str| RegistryError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("path must start with '/'"));
    }
    if path.contains(['?', '#']) {
        return Err(invalid("path must not contain a query string or fragment"));
    }
    if path.contains(char::is_whitespace) {
        return Err(invalid("path must not contain whitespace"));
    }

    let segments: Vec<&str> = path[1..].split('/').collect();
    for (index, segment) in segments.iter().enumerate() {
        if let Some(name) = segment.strip_prefix([':', '*']) {
            if name.is_empty() {
                return Err(invalid("parameters must have a name"));
            }
            if segment.starts_with('*') && index + 1 != segments.len() {
                return Err(invalid("catch-all parameter must be the last segment"));
            }
        }
    }
    Ok(())
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册控制器自身声明的路由表
    pub fn register<C: Controller>(&mut self) -> RegistryResult<&mut Self> {
        C::register(self)?;
        Ok(self)
    }

    /// 设置控制器的基础路径
    ///
    /// 重复注册相同路径不产生影响，不同路径返回 `BasePathConflict`
    pub fn register_controller<C: 'static>(&mut self, base_path: &str) -> RegistryResult<()> {
        check_path(base_path)?;
        let metadata = self
            .controllers
            .entry(TypeId::of::<C>())
            .or_insert_with(|| ControllerMetadata::new(type_name::<C>()));

        match &metadata.base_path {
            Some(existing) if existing != base_path => Err(RegistryError::BasePathConflict {
                controller: metadata.type_name.to_string(),
                existing: existing.clone(),
                requested: base_path.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                tracing::debug!(controller = metadata.type_name, base_path, "Registered controller");
                metadata.base_path = Some(base_path.to_string());
                Ok(())
            }
        }
    }

    /// 追加一条路由，同一控制器内 (方法, 子路径) 必须唯一
    pub fn register_route<C, H, Fut, R, E>(
        &mut self,
        descriptor: RouteDescriptor,
        handler: H,
    ) -> RegistryResult<()>
    where
        C: Send + Sync + 'static,
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        check_path(&descriptor.path)?;
        let metadata = self
            .controllers
            .entry(TypeId::of::<C>())
            .or_insert_with(|| ControllerMetadata::new(type_name::<C>()));

        let duplicate = metadata.routes.iter().any(|r| {
            r.descriptor.method == descriptor.method && r.descriptor.path == descriptor.path
        });
        if duplicate {
            return Err(RegistryError::DuplicateRoute {
                controller: metadata.type_name.to_string(),
                method: descriptor.method.to_string(),
                path: descriptor.path,
            });
        }

        let controller_name = metadata.type_name;
        let handler: ErasedHandler = Arc::new(
            move |instance: ControllerInstance, req: Request| -> BoxFuture<'static, anyhow::Result<Response>> {
                let future = instance
                    .downcast::<C>()
                    .ok()
                    .map(|controller| handler(controller, req));
                Box::pin(async move {
                    match future {
                        Some(future) => future
                            .await
                            .map(IntoResponse::into_response)
                            .map_err(Into::into),
                        None => Err(anyhow::anyhow!(
                            "controller instance is not a {}",
                            controller_name
                        )),
                    }
                })
            },
        );

        metadata.routes.push(RegisteredRoute { descriptor, handler });
        Ok(())
    }

    /// 为处理函数绑定请求数据校验
    pub fn bind_validation<C, S>(
        &mut self,
        handler_id: &str,
        source: ValidationSource,
        options: ValidationOptions,
    ) -> RegistryResult<()>
    where
        C: 'static,
        S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
    {
        let bindings = self.bindings.entry(TypeId::of::<C>()).or_default();
        if bindings
            .iter()
            .any(|b| b.handler_id == handler_id && b.source == source)
        {
            return Err(RegistryError::DuplicateBinding {
                controller: type_name::<C>().to_string(),
                handler: handler_id.to_string(),
                source_name: source.to_string(),
            });
        }

        bindings.push(ValidationBinding {
            handler_id: handler_id.to_string(),
            source,
            validator: Arc::new(SchemaValidator::<S>::new(source, options)),
        });
        Ok(())
    }

    /// 以流式 API 注册控制器
    pub fn controller<C: Send + Sync + 'static>(
        &mut self,
        base_path: &str,
    ) -> RegistryResult<ControllerScope<'_, C>> {
        self.register_controller::<C>(base_path)?;
        Ok(ControllerScope {
            registry: self,
            _controller: PhantomData,
        })
    }

    pub fn metadata<C: 'static>(&self) -> Option<&ControllerMetadata> {
        self.controllers.get(&TypeId::of::<C>())
    }

    pub(crate) fn metadata_by_id(&self, type_id: &TypeId) -> Option<&ControllerMetadata> {
        self.controllers.get(type_id)
    }

    /// 控制器的校验绑定，按 (处理函数, 来源) 返回
    pub fn validation_binding<C: 'static>(&self) -> Vec<(&str, ValidationSource)> {
        self.bindings
            .get(&TypeId::of::<C>())
            .map(|bindings| {
                bindings
                    .iter()
                    .map(|b| (b.handler_id.as_str(), b.source))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn bindings_by_id(&self, type_id: &TypeId) -> &[ValidationBinding] {
        self.bindings
            .get(type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// 单个控制器的注册入口
pub struct ControllerScope<'a, C> {
    registry: &'a mut ControllerRegistry,
    _controller: PhantomData<fn() -> C>,
}

impl<'a, C: Send + Sync + 'static> ControllerScope<'a, C> {
    pub fn route_with<H, Fut, R, E>(
        &mut self,
        descriptor: RouteDescriptor,
        handler: H,
    ) -> RegistryResult<&mut Self>
    where
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        self.registry.register_route::<C, H, Fut, R, E>(descriptor, handler)?;
        Ok(self)
    }

    pub fn get<H, Fut, R, E>(&mut self, path: &str, handler_id: &str, handler: H) -> RegistryResult<&mut Self>
    where
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        self.route_with(RouteDescriptor::new(HttpMethod::Get, path, handler_id), handler)
    }

    pub fn post<H, Fut, R, E>(&mut self, path: &str, handler_id: &str, handler: H) -> RegistryResult<&mut Self>
    where
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        self.route_with(RouteDescriptor::new(HttpMethod::Post, path, handler_id), handler)
    }

    pub fn put<H, Fut, R, E>(&mut self, path: &str, handler_id: &str, handler: H) -> RegistryResult<&mut Self>
    where
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        self.route_with(RouteDescriptor::new(HttpMethod::Put, path, handler_id), handler)
    }

    pub fn patch<H, Fut, R, E>(&mut self, path: &str, handler_id: &str, handler: H) -> RegistryResult<&mut Self>
    where
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        self.route_with(RouteDescriptor::new(HttpMethod::Patch, path, handler_id), handler)
    }

    pub fn delete<H, Fut, R, E>(&mut self, path: &str, handler_id: &str, handler: H) -> RegistryResult<&mut Self>
    where
        H: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<anyhow::Error>,
    {
        self.route_with(RouteDescriptor::new(HttpMethod::Delete, path, handler_id), handler)
    }

    pub fn body<S>(&mut self, handler_id: &str, options: ValidationOptions) -> RegistryResult<&mut Self>
    where
        S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
    {
        self.registry
            .bind_validation::<C, S>(handler_id, ValidationSource::Body, options)?;
        Ok(self)
    }

    pub fn query<S>(&mut self, handler_id: &str, options: ValidationOptions) -> RegistryResult<&mut Self>
    where
        S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
    {
        self.registry
            .bind_validation::<C, S>(handler_id, ValidationSource::Query, options)?;
        Ok(self)
    }

    pub fn params<S>(&mut self, handler_id: &str, options: ValidationOptions) -> RegistryResult<&mut Self>
    where
        S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
    {
        self.registry
            .bind_validation::<C, S>(handler_id, ValidationSource::Param, options)?;
        Ok(self)
    }

    pub fn headers<S>(&mut self, handler_id: &str, options: ValidationOptions) -> RegistryResult<&mut Self>
    where
        S: Schema + Validate + DeserializeOwned + Send + Sync + 'static,
    {
        self.registry
            .bind_validation::<C, S>(handler_id, ValidationSource::Header, options)?;
        Ok(self)
    }
}

/// 控制器
///
/// 控制器类型通过 `register` 声明自己的基础路径、路由和校验绑定
pub trait Controller: Send + Sync + 'static {
    fn register(registry: &mut ControllerRegistry) -> RegistryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ApiResponse;
    use banana_validator::Validate;
    use serde::Deserialize;

    #[derive(Default)]
    struct UserController;

    impl UserController {
        async fn list(self: Arc<Self>, _req: Request) -> anyhow::Result<ApiResponse> {
            Ok(ApiResponse::ok("list"))
        }

        async fn get(self: Arc<Self>, _req: Request) -> anyhow::Result<ApiResponse> {
            Ok(ApiResponse::ok("get"))
        }
    }

    #[derive(Debug, Deserialize, Validate)]
    struct ListQuery {
        #[allow(dead_code)]
        page: Option<u32>,
    }

    #[test]
    fn test_routes_keep_declaration_order() {
        let mut registry = ControllerRegistry::new();
        registry
            .controller::<UserController>("/users")
            .unwrap()
            .get("/list", "list", UserController::list)
            .unwrap()
            .get("/:id", "get", UserController::get)
            .unwrap()
            .delete("/:id", "remove", UserController::get)
            .unwrap();

        let metadata = registry.metadata::<UserController>().unwrap();
        assert_eq!(metadata.base_path(), Some("/users"));
        let routes: Vec<_> = metadata
            .routes()
            .map(|r| (r.method, r.path.as_str(), r.handler_id.as_str()))
            .collect();
        assert_eq!(
            routes,
            vec![
                (HttpMethod::Get, "/list", "list"),
                (HttpMethod::Get, "/:id", "get"),
                (HttpMethod::Delete, "/:id", "remove"),
            ]
        );
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut registry = ControllerRegistry::new();
        let mut scope = registry.controller::<UserController>("/users").unwrap();
        scope.get("/list", "list", UserController::list).unwrap();
        let err = scope
            .get("/list", "list_again", UserController::list)
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_base_path_conflict() {
        let mut registry = ControllerRegistry::new();
        registry.register_controller::<UserController>("/users").unwrap();
        registry.register_controller::<UserController>("/users").unwrap();
        let err = registry
            .register_controller::<UserController>("/people")
            .unwrap_err();
        assert!(matches!(err, RegistryError::BasePathConflict { .. }));
    }

    #[test]
    fn test_route_without_base_path() {
        let mut registry = ControllerRegistry::new();
        registry
            .register_route::<UserController, _, _, _, _>(
                RouteDescriptor::new(HttpMethod::Get, "/list", "list"),
                UserController::list,
            )
            .unwrap();
        assert_eq!(registry.metadata::<UserController>().unwrap().base_path(), None);
    }

    #[test]
    fn test_invalid_paths() {
        assert!(check_path("/users/:id").is_ok());
        assert!(check_path("users").is_err());
        assert!(check_path("/users?x=1").is_err());
        assert!(check_path("/a b").is_err());
    }

    #[test]
    fn test_parameter_segments_must_be_routable() {
        assert!(check_path("/files/*rest").is_ok());
        assert!(check_path("/users/:id/posts/:post_id").is_ok());

        for path in ["/:", "/users/:/x", "/*", "/*rest/x"] {
            let err = check_path(path).unwrap_err();
            assert!(
                matches!(&err, RegistryError::InvalidPath { path: p, .. } if p == path),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_unnamed_parameter_rejected_at_registration() {
        let mut registry = ControllerRegistry::new();
        let err = registry
            .controller::<UserController>("/users")
            .unwrap()
            .get("/:", "get", UserController::get)
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::InvalidPath { .. }));
        assert_eq!(registry.metadata::<UserController>().unwrap().routes().count(), 0);
    }

    #[test]
    fn test_validation_bindings() {
        let mut registry = ControllerRegistry::new();
        registry
            .controller::<UserController>("/users")
            .unwrap()
            .query::<ListQuery>("list", ValidationOptions::default())
            .unwrap();
        assert_eq!(
            registry.validation_binding::<UserController>(),
            vec![("list", ValidationSource::Query)]
        );

        let err = registry
            .bind_validation::<UserController, ListQuery>(
                "list",
                ValidationSource::Query,
                ValidationOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateBinding { .. }));
    }
}
