//! 视图渲染接缝：处理器只产出视图名与上下文，具体输出格式由渲染器决定。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

pub mod views {
    pub const HOME: &str = "base/home";
    pub const ROOM: &str = "base/room";
    pub const PROFILE: &str = "base/profile";
    pub const ROOM_FORM: &str = "base/room_form";
    pub const DELETE: &str = "base/delete";
    pub const LOGIN_REGISTER: &str = "base/login_register";
    pub const UPDATE_USER: &str = "base/update_user";
    pub const TOPICS: &str = "base/topics";
    pub const ACTIVITY: &str = "base/activity";
}

/// 命名视图及其上下文。
#[derive(Debug, Clone)]
pub struct View {
    pub name: &'static str,
    pub context: Value,
    pub messages: Vec<String>,
}

impl View {
    pub fn new(name: &'static str, context: impl Serialize) -> Result<Self, ApiError> {
        Ok(Self {
            name,
            context: serde_json::to_value(context)?,
            messages: Vec::new(),
        })
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

pub trait ViewRenderer: Send + Sync {
    fn render(&self, status: StatusCode, view: View) -> Response;
}

/// 默认渲染器：把视图序列化为 JSON 文档。
#[derive(Debug, Default, Clone)]
pub struct JsonViewRenderer;

impl ViewRenderer for JsonViewRenderer {
    fn render(&self, status: StatusCode, view: View) -> Response {
        let body = json!({
            "view": view.name,
            "context": view.context,
            "messages": view.messages,
        });
        (status, Json(body)).into_response()
    }
}
