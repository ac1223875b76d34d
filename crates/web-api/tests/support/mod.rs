#![allow(dead_code)]

use std::sync::Arc;

use application::SystemClock;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use config::AppConfig;
use infrastructure::{BcryptPasswordHasher, MemoryStorage};
use serde_json::Value;
use tower::ServiceExt;
use web_api::{app, AppState, Ports};

pub const PASSWORD: &str = "correct-horse";

/// 基于内存存储的整站路由，bcrypt 成本降到最低以加快测试。
pub fn build_app() -> Router {
    let storage = MemoryStorage::new();
    let state = AppState::from_ports(Ports {
        user_repository: storage.user_repository,
        topic_repository: storage.topic_repository,
        room_repository: storage.room_repository,
        message_repository: storage.message_repository,
        password_hasher: Arc::new(BcryptPasswordHasher::new(4)),
        clock: Arc::new(SystemClock),
    });
    app(state, &AppConfig::default().session)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub text: String,
}

impl TestResponse {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        Self {
            status,
            location,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).expect("json body")
    }

    pub fn context(&self) -> Value {
        self.json()["context"].clone()
    }
}

/// 模拟一个浏览器：在请求之间携带会话 cookie。
pub struct Browser {
    router: Router,
    cookie: Option<String>,
}

impl Browser {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    pub fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty()).expect("request");
        self.send(request).await
    }

    /// 表单值只使用无需转义的字符。
    pub async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    pub async fn register(&mut self, username: &str) -> TestResponse {
        self.post(
            "/register",
            &[
                ("username", username),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await
    }

    pub async fn create_room(&mut self, topic: &str, name: &str) -> TestResponse {
        self.post(
            "/create-room",
            &[("topic", topic), ("name", name), ("description", "")],
        )
        .await
    }

    /// 首页第一个房间的 id。
    pub async fn first_room_id(&mut self) -> String {
        let home = self.get("/").await;
        home.context()["rooms"][0]["id"]
            .as_str()
            .expect("room id")
            .to_owned()
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            if set_cookie.contains("Max-Age=0") {
                self.cookie = None;
            } else if let Some(pair) = set_cookie.split(';').next() {
                self.cookie = Some(pair.to_owned());
            }
        }

        TestResponse::read(response).await
    }
}
