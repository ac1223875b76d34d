use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 非房主/作者访问编辑、删除页面时的响应正文。
pub const FORBIDDEN_MESSAGE: &str = "You are not allowed here!!";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", FORBIDDEN_MESSAGE)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::{DomainError, RepositoryError};

        if let Some(message) = error.validation_message() {
            return ApiError::validation(message);
        }

        match error {
            AppErr::Domain(DomainError::UserNotFound) => ApiError::not_found("user not found"),
            AppErr::Domain(DomainError::RoomNotFound) => ApiError::not_found("room not found"),
            AppErr::Domain(DomainError::MessageNotFound) => {
                ApiError::not_found("message not found")
            }
            AppErr::Domain(DomainError::OperationNotAllowed) => ApiError::forbidden(),
            AppErr::Domain(other) => ApiError::validation(other.to_string()),
            AppErr::Repository(RepositoryError::NotFound) => {
                ApiError::not_found("requested resource not found")
            }
            AppErr::Repository(RepositoryError::Conflict) => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
            }
            AppErr::Repository(RepositoryError::Storage { message }) => {
                tracing::error!(error = %message, "storage failure");
                ApiError::internal_server_error("storage error")
            }
            AppErr::Password(err) => {
                tracing::error!(error = %err, "password hasher failure");
                ApiError::internal_server_error("password error")
            }
            AppErr::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "invalid credentials",
            ),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(error: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %error, "session store failure");
        ApiError::internal_server_error("session error")
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        tracing::error!(error = %error, "failed to build view context");
        ApiError::internal_server_error("render error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status == StatusCode::FORBIDDEN {
            return (self.status, self.body.message).into_response();
        }
        (self.status, Json(self.body)).into_response()
    }
}
