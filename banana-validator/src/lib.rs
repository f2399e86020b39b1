//! Banana Validator - 请求数据校验
//!
//! 字段规则、形状检查（未声明属性、缺失属性）以及 `#[derive(Validate)]`

extern crate self as banana_validator;

pub mod error;
pub mod schema;
pub mod validator;

pub use error::*;
pub use schema::*;
pub use validator::*;

// 重新导出宏
pub use banana_validator_macros::Validate;
