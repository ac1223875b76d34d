use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::password::PasswordHasherError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    #[error("authentication failed")]
    Authentication,
}

impl ApplicationError {
    /// 表单输入错误的提示文本，其它错误返回 `None`。
    pub fn validation_message(&self) -> Option<String> {
        match self {
            ApplicationError::Domain(DomainError::InvalidArgument { field, reason }) => {
                Some(format!("{field}: {reason}"))
            }
            ApplicationError::Domain(DomainError::UserAlreadyExists) => {
                Some("username: a user with that username already exists".to_owned())
            }
            _ => None,
        }
    }
}
