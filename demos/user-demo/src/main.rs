//! 用户接口示例
//!
//! ```text
//! cd demos/user-demo && cargo run
//! curl 'http://127.0.0.1:3000/users/list?page=1&limit=10'
//! curl -X POST http://127.0.0.1:3000/users -H 'content-type: application/json' \
//!      -d '{"name":"Carol","email":"carol@example.com"}'
//! ```

mod controller;
mod models;

use banana_web::prelude::*;
use controller::UserController;

#[tokio::main]
async fn main() -> ApplicationResult<()> {
    BananaApplication::new("user-demo")
        .run(|_env| {
            let mut registry = ControllerRegistry::new();
            registry.register::<UserController>()?;
            Ok(BananaApp::new(registry).controller::<UserController>())
        })
        .await
}
