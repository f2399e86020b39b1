use banana_validator::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(not_blank, length(min = 2, max = 32))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// 更新时只修改出现的字段
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(range(min = 1))]
    pub id: u32,
    #[validate(not_blank, length(min = 2, max = 32))]
    pub name: Option<String>,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(range(min = 1))]
    pub id: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: u32 = 20;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}
