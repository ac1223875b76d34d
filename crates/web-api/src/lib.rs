//! Web 层。
//!
//! 提供 Axum 路由与会话中间件，将表单请求委托给应用层的用例服务，
//! 再把视图名与上下文交给可替换的渲染器输出。

mod error;
mod render;
mod routes;
mod session;
mod state;

pub use error::{ApiError, FORBIDDEN_MESSAGE};
pub use render::{views, JsonViewRenderer, View, ViewRenderer};
pub use routes::{app, router, session_layer};
pub use session::{safe_next, AuthUser, MaybeUser};
pub use state::{AppState, Ports};
