use crate::models::{CreateUser, ListQuery, UpdateUser, User, UserQuery};
use banana_web::prelude::*;
use tokio::sync::RwLock;

struct UserStore {
    users: Vec<User>,
    next_id: u32,
}

/// 用户接口，数据保存在内存中
pub struct UserController {
    store: RwLock<UserStore>,
}

impl Default for UserController {
    fn default() -> Self {
        let users = vec![
            User {
                id: 1,
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
            User {
                id: 2,
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            },
        ];
        Self {
            store: RwLock::new(UserStore { users, next_id: 3 }),
        }
    }
}

impl UserController {
    async fn create(self: Arc<Self>, req: Request) -> Result<ApiResponse<User>> {
        let payload: CreateUser = req.json_body().await?;
        let mut store = self.store.write().await;

        if store.users.iter().any(|u| u.email == payload.email) {
            return Err(ApiError::conflict(format!("Email {} is already registered", payload.email)).into());
        }

        let user = User {
            id: store.next_id,
            name: payload.name,
            email: payload.email,
        };
        store.next_id += 1;
        store.users.push(user.clone());

        tracing::info!(id = user.id, "User created");
        Ok(ApiResponse::success("Create User", user))
    }

    async fn list(self: Arc<Self>, req: Request) -> Result<ApiResponse<Vec<User>>> {
        let query: ListQuery = req.query_params()?;
        let limit = query.limit() as usize;
        let skip = (query.page() as usize).saturating_sub(1).saturating_mul(limit);

        let store = self.store.read().await;
        let users = store
            .users
            .iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect();
        Ok(ApiResponse::success("List all users", users))
    }

    async fn get(self: Arc<Self>, req: Request) -> Result<ApiResponse<User>> {
        let query: UserQuery = req.query_params()?;
        let store = self.store.read().await;
        let user = store
            .users
            .iter()
            .find(|u| u.id == query.id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", query.id)))?;
        Ok(ApiResponse::success("Get User", user))
    }

    async fn update(self: Arc<Self>, req: Request) -> Result<ApiResponse<User>> {
        let payload: UpdateUser = req.json_body().await?;
        let mut store = self.store.write().await;
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == payload.id)
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", payload.id)))?;

        if let Some(name) = payload.name {
            user.name = name;
        }
        if let Some(email) = payload.email {
            user.email = email;
        }
        Ok(ApiResponse::success("Update User", user.clone()))
    }

    async fn delete(self: Arc<Self>, req: Request) -> Result<ApiResponse> {
        let query: UserQuery = req.query_params()?;
        let mut store = self.store.write().await;
        let before = store.users.len();
        store.users.retain(|u| u.id != query.id);

        if store.users.len() == before {
            return Err(ApiError::not_found(format!("User {} not found", query.id)).into());
        }
        Ok(ApiResponse::ok("Delete User"))
    }
}

impl Controller for UserController {
    fn register(registry: &mut ControllerRegistry) -> RegistryResult<()> {
        registry
            .controller::<Self>("/users")?
            .post("/", "create", Self::create)?
            .get("/list", "list", Self::list)?
            .get("/", "get", Self::get)?
            .put("/", "update", Self::update)?
            .delete("/", "delete", Self::delete)?
            .body::<CreateUser>("create", ValidationOptions::new())?
            .query::<ListQuery>("list", ValidationOptions::new().skip_missing_properties(true))?
            .query::<UserQuery>("get", ValidationOptions::new())?
            .body::<UpdateUser>("update", ValidationOptions::new().skip_missing_properties(true))?
            .query::<UserQuery>("delete", ValidationOptions::new())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let mut registry = ControllerRegistry::new();
        registry.register::<UserController>().unwrap();
        BananaApp::new(registry)
            .controller::<UserController>()
            .build()
            .unwrap()
    }

    async fn send(
        router: axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_users() {
        let (status, json) = send(router(), "GET", "/users/list?limit=1&page=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "List all users");
        assert_eq!(json["data"][0]["name"], "Bob");

        let (status, json) = send(router(), "GET", "/users/list?page=50000000&limit=100", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], json!([]));

        let (status, json) = send(router(), "GET", "/users/list?limit=500", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "limit must be at most 100, but was 500");
    }

    #[tokio::test]
    async fn test_get_user() {
        let (status, json) = send(router(), "GET", "/users?id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["email"], "alice@example.com");

        let (status, json) = send(router(), "GET", "/users?id=9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "User 9 not found");

        let (status, json) = send(router(), "GET", "/users", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "id must not be null");
    }

    #[tokio::test]
    async fn test_create_user() {
        let body = json!({ "name": "Carol", "email": "carol@example.com" });
        let (status, json) = send(router(), "POST", "/users", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], 3);

        let body = json!({ "name": "Carol", "email": "alice@example.com" });
        let (status, _) = send(router(), "POST", "/users", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let body = json!({ "name": "Carol", "email": "carol@example.com", "admin": true });
        let (status, json) = send(router(), "POST", "/users", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "property admin should not exist");
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let router = router();

        let body = json!({ "id": 2, "email": "not-an-email" });
        let (status, json) = send(router.clone(), "PUT", "/users", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "email is not a valid address");

        let body = json!({ "id": 2, "name": "Bobby" });
        let (status, json) = send(router.clone(), "PUT", "/users", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Bobby");

        let (status, json) = send(router.clone(), "DELETE", "/users?id=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Delete User");
        assert!(json.get("data").is_none());

        let (status, _) = send(router, "DELETE", "/users?id=2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
