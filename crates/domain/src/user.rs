use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Option<UserEmail>,
    pub password: PasswordHash,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// 注册新用户，用户名统一转为小写存储。
    pub fn register(id: UserId, username: Username, password: PasswordHash, now: Timestamp) -> Self {
        Self {
            id,
            username: username.to_lowercase(),
            email: None,
            password,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_profile(&mut self, username: Username, email: Option<UserEmail>, now: Timestamp) {
        self.username = username;
        self.email = email;
        self.updated_at = now;
    }
}
