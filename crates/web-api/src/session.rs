//! 基于 `tower-sessions` 的登录态与删除确认令牌。

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use data_encoding::BASE64URL_NOPAD;
use domain::UserId;
use tower_sessions::Session;

use crate::error::ApiError;

const USER_ID_KEY: &str = "user_id";
const CONFIRMATION_PREFIX: &str = "confirm:";

pub async fn current_user(session: &Session) -> Result<Option<UserId>, ApiError> {
    Ok(session.get::<UserId>(USER_ID_KEY).await?)
}

/// 绑定用户前轮换会话 id，防止会话固定攻击。
pub async fn sign_in(session: &Session, user_id: UserId) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await?;
    Ok(())
}

/// 无条件销毁当前会话，重复调用无副作用。
pub async fn sign_out(session: &Session) -> Result<(), ApiError> {
    session.flush().await?;
    Ok(())
}

/// 登录后跳转目标：只接受站内绝对路径，其它情况回首页。
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_owned()
        }
        _ => "/".to_owned(),
    }
}

fn new_token() -> String {
    let bytes: [u8; 16] = rand::random();
    BASE64URL_NOPAD.encode(&bytes)
}

/// 为删除确认页签发一次性令牌，作用域如 `room:<id>`。
pub async fn issue_confirmation(session: &Session, scope: &str) -> Result<String, ApiError> {
    let token = new_token();
    session
        .insert(&format!("{CONFIRMATION_PREFIX}{scope}"), token.clone())
        .await?;
    Ok(token)
}

/// 取出并作废令牌；缺失或不匹配时返回校验错误。
pub async fn consume_confirmation(
    session: &Session,
    scope: &str,
    token: Option<&str>,
) -> Result<(), ApiError> {
    let stored = session
        .remove::<String>(&format!("{CONFIRMATION_PREFIX}{scope}"))
        .await?;
    match (stored, token) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => {
            tracing::warn!(scope, "missing or stale delete confirmation");
            Err(ApiError::validation(
                "confirmation expired, please confirm the deletion again",
            ))
        }
    }
}

/// 已登录用户。未登录时重定向到 `/login?next=<当前路径>`。
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        match current_user(&session).await.map_err(IntoResponse::into_response)? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                let target = format!("/login?next={}", parts.uri.path());
                Err(Redirect::to(&target).into_response())
            }
        }
    }
}

/// 可选登录态，用于公开页面与登录/注册页的跳转判断。
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let user = current_user(&session)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(MaybeUser(user))
    }
}
