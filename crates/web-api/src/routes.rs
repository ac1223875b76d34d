use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use config::SessionConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use application::{
    ApplicationError, AuthenticateUserRequest, RegisterUserRequest, RoomDraft,
    UpdateProfileRequest,
};
use domain::{MessageId, RoomId, SearchTerm, UserId};

use crate::{
    error::ApiError,
    render::{views, View},
    session::{self, AuthUser, MaybeUser},
    state::AppState,
};

type HandlerResult = Result<Response, ApiError>;

const INVALID_CREDENTIALS: &str = "Username OR password does not exist";

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    username: String,
    password1: String,
    password2: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RoomForm {
    topic: String,
    name: String,
    #[serde(default)]
    description: String,
}

impl From<RoomForm> for RoomDraft {
    fn from(form: RoomForm) -> Self {
        RoomDraft {
            topic: form.topic,
            name: form.name,
            description: form.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageForm {
    body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ProfileForm {
    username: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmForm {
    token: Option<String>,
}

/// 所有页面共享的上下文：当前登录用户加上页面自身的数据。
#[derive(Serialize)]
struct Page<T: Serialize> {
    current_user: Option<UserId>,
    #[serde(flatten)]
    data: T,
}

impl<T: Serialize> Page<T> {
    fn new(current_user: Option<UserId>, data: T) -> Self {
        Self { current_user, data }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(home))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/register", get(register_page).post(register))
        .route("/room/{room_id}", get(room).post(post_message))
        .route("/profile/{user_id}", get(profile))
        .route("/create-room", get(create_room_page).post(create_room))
        .route(
            "/update-room/{room_id}",
            get(update_room_page).post(update_room),
        )
        .route(
            "/delete-room/{room_id}",
            get(delete_room_page).post(delete_room),
        )
        .route(
            "/delete-message/{message_id}",
            get(delete_message_page).post(delete_message),
        )
        .route("/update-user", get(update_user_page).post(update_user))
        .route("/topics", get(topics))
        .route("/activity", get(activity))
        .with_state(state)
}

pub fn session_layer(config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.secure_cookie)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.inactivity_minutes,
        )))
}

/// 完整应用：路由 + 会话 + 请求追踪。
pub fn app(state: AppState, session: &SessionConfig) -> Router {
    router(state)
        .layer(session_layer(session))
        .layer(TraceLayer::new_for_http())
}

fn parse_id<T: From<Uuid>>(raw: &str, what: &str) -> Result<T, ApiError> {
    Uuid::parse_str(raw)
        .map(T::from)
        .map_err(|_| ApiError::not_found(format!("{what} not found")))
}

fn page(state: &AppState, name: &'static str, context: impl Serialize) -> HandlerResult {
    Ok(state.renderer.render(StatusCode::OK, View::new(name, context)?))
}

/// 表单校验失败时带提示重新渲染（422），其它错误照常上抛。
fn rerender(
    state: &AppState,
    error: ApplicationError,
    name: &'static str,
    context: impl Serialize,
) -> HandlerResult {
    match error.validation_message() {
        Some(message) => Ok(state.renderer.render(
            StatusCode::UNPROCESSABLE_ENTITY,
            View::new(name, context)?.with_message(message),
        )),
        None => Err(ApiError::from(error)),
    }
}

fn redirect(to: &str) -> HandlerResult {
    Ok(Redirect::to(to).into_response())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> HandlerResult {
    if user.is_some() {
        return redirect("/");
    }
    page(
        &state,
        views::LOGIN_REGISTER,
        json!({ "page": "login", "next": session::safe_next(query.next.as_deref()) }),
    )
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    if user.is_some() {
        return redirect("/");
    }
    let next = session::safe_next(form.next.as_deref().or(query.next.as_deref()));

    let result = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            username: form.username.clone(),
            password: form.password,
        })
        .await;

    match result {
        Ok(user) => {
            session::sign_in(&session, user.id).await?;
            tracing::info!(user_id = %user.id, "user logged in");
            redirect(&next)
        }
        Err(ApplicationError::Authentication) => {
            let view = View::new(
                views::LOGIN_REGISTER,
                json!({ "page": "login", "username": form.username, "next": next }),
            )?
            .with_message(INVALID_CREDENTIALS);
            Ok(state.renderer.render(StatusCode::UNAUTHORIZED, view))
        }
        Err(error) => Err(ApiError::from(error)),
    }
}

/// 只接受 POST，GET 返回 405。
async fn logout(session: Session) -> HandlerResult {
    session::sign_out(&session).await?;
    redirect("/")
}

async fn register_page(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> HandlerResult {
    if user.is_some() {
        return redirect("/");
    }
    page(&state, views::LOGIN_REGISTER, json!({ "page": "register" }))
}

async fn register(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RegisterForm>,
) -> HandlerResult {
    if user.is_some() {
        return redirect("/");
    }

    let result = state
        .user_service
        .register(RegisterUserRequest {
            username: form.username.clone(),
            password: form.password1,
            password_confirmation: form.password2,
        })
        .await;

    match result {
        Ok(user) => {
            session::sign_in(&session, user.id).await?;
            redirect("/")
        }
        Err(error) => rerender(
            &state,
            error,
            views::LOGIN_REGISTER,
            json!({ "page": "register", "username": form.username }),
        ),
    }
}

async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<SearchQuery>,
) -> HandlerResult {
    let view = state
        .search_service
        .home(SearchTerm::from_query(query.q))
        .await?;
    page(&state, views::HOME, Page::new(user, view))
}

async fn room(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(room_id): Path<String>,
) -> HandlerResult {
    let room_id: RoomId = parse_id(&room_id, "room")?;
    let detail = state.room_service.room_detail(room_id).await?;
    page(&state, views::ROOM, Page::new(user, detail))
}

async fn post_message(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(room_id): Path<String>,
    Form(form): Form<MessageForm>,
) -> HandlerResult {
    let room_id: RoomId = parse_id(&room_id, "room")?;

    match state
        .room_service
        .post_message(actor, room_id, form.body)
        .await
    {
        Ok(_) => redirect(&format!("/room/{room_id}")),
        Err(error) => {
            let Some(message) = error.validation_message() else {
                return Err(ApiError::from(error));
            };
            let detail = state.room_service.room_detail(room_id).await?;
            let view = View::new(views::ROOM, Page::new(Some(actor), detail))?.with_message(message);
            Ok(state
                .renderer
                .render(StatusCode::UNPROCESSABLE_ENTITY, view))
        }
    }
}

async fn profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(user_id): Path<String>,
) -> HandlerResult {
    let user_id: UserId = parse_id(&user_id, "user")?;
    let view = state.search_service.profile(user_id).await?;
    page(&state, views::PROFILE, Page::new(user, view))
}

async fn create_room_page(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> HandlerResult {
    let topics = state.search_service.all_topics().await?;
    page(
        &state,
        views::ROOM_FORM,
        Page::new(Some(actor), json!({ "topics": topics, "room": null })),
    )
}

async fn create_room(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Form(form): Form<RoomForm>,
) -> HandlerResult {
    match state
        .room_service
        .create_room(actor, RoomDraft::from(form.clone()))
        .await
    {
        Ok(_) => redirect("/"),
        Err(error) => {
            let topics = state.search_service.all_topics().await?;
            rerender(
                &state,
                error,
                views::ROOM_FORM,
                Page::new(
                    Some(actor),
                    json!({ "topics": topics, "room": null, "form": form }),
                ),
            )
        }
    }
}

async fn update_room_page(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(room_id): Path<String>,
) -> HandlerResult {
    let room_id: RoomId = parse_id(&room_id, "room")?;
    let room = state.room_service.editable_room(actor, room_id).await?;
    let topics = state.search_service.all_topics().await?;
    let form = RoomForm {
        topic: room.topic.name.clone(),
        name: room.name.clone(),
        description: room.description.clone(),
    };
    page(
        &state,
        views::ROOM_FORM,
        Page::new(
            Some(actor),
            json!({ "topics": topics, "room": room, "form": form }),
        ),
    )
}

async fn update_room(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(room_id): Path<String>,
    Form(form): Form<RoomForm>,
) -> HandlerResult {
    let room_id: RoomId = parse_id(&room_id, "room")?;

    match state
        .room_service
        .update_room(actor, room_id, RoomDraft::from(form.clone()))
        .await
    {
        Ok(_) => redirect("/"),
        Err(error) => {
            let topics = state.search_service.all_topics().await?;
            rerender(
                &state,
                error,
                views::ROOM_FORM,
                Page::new(
                    Some(actor),
                    json!({ "topics": topics, "room": { "id": room_id }, "form": form }),
                ),
            )
        }
    }
}

fn room_scope(room_id: RoomId) -> String {
    format!("room:{room_id}")
}

fn message_scope(message_id: MessageId) -> String {
    format!("message:{message_id}")
}

async fn render_delete(
    state: &AppState,
    session: &Session,
    actor: UserId,
    scope: &str,
    obj: impl Serialize,
    status: StatusCode,
    message: Option<String>,
) -> HandlerResult {
    let token = session::issue_confirmation(session, scope).await?;
    let mut view = View::new(
        views::DELETE,
        Page::new(Some(actor), json!({ "obj": obj, "token": token })),
    )?;
    if let Some(message) = message {
        view = view.with_message(message);
    }
    Ok(state.renderer.render(status, view))
}

async fn delete_room_page(
    State(state): State<AppState>,
    session: Session,
    AuthUser(actor): AuthUser,
    Path(room_id): Path<String>,
) -> HandlerResult {
    let room_id: RoomId = parse_id(&room_id, "room")?;
    let room = state.room_service.deletable_room(actor, room_id).await?;
    render_delete(
        &state,
        &session,
        actor,
        &room_scope(room_id),
        room,
        StatusCode::OK,
        None,
    )
    .await
}

async fn delete_room(
    State(state): State<AppState>,
    session: Session,
    AuthUser(actor): AuthUser,
    Path(room_id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> HandlerResult {
    let room_id: RoomId = parse_id(&room_id, "room")?;
    let room = state.room_service.deletable_room(actor, room_id).await?;

    let scope = room_scope(room_id);
    if let Err(error) =
        session::consume_confirmation(&session, &scope, form.token.as_deref()).await
    {
        if error.status() != StatusCode::UNPROCESSABLE_ENTITY {
            return Err(error);
        }
        return render_delete(
            &state,
            &session,
            actor,
            &scope,
            room,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("Please confirm the deletion again.".to_owned()),
        )
        .await;
    }

    state.room_service.delete_room(actor, room_id).await?;
    redirect("/")
}

async fn delete_message_page(
    State(state): State<AppState>,
    session: Session,
    AuthUser(actor): AuthUser,
    Path(message_id): Path<String>,
) -> HandlerResult {
    let message_id: MessageId = parse_id(&message_id, "message")?;
    let message = state
        .room_service
        .deletable_message(actor, message_id)
        .await?;
    render_delete(
        &state,
        &session,
        actor,
        &message_scope(message_id),
        message,
        StatusCode::OK,
        None,
    )
    .await
}

async fn delete_message(
    State(state): State<AppState>,
    session: Session,
    AuthUser(actor): AuthUser,
    Path(message_id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> HandlerResult {
    let message_id: MessageId = parse_id(&message_id, "message")?;
    let message = state
        .room_service
        .deletable_message(actor, message_id)
        .await?;

    let scope = message_scope(message_id);
    if let Err(error) =
        session::consume_confirmation(&session, &scope, form.token.as_deref()).await
    {
        if error.status() != StatusCode::UNPROCESSABLE_ENTITY {
            return Err(error);
        }
        return render_delete(
            &state,
            &session,
            actor,
            &scope,
            message,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("Please confirm the deletion again.".to_owned()),
        )
        .await;
    }

    state
        .room_service
        .delete_message(actor, message_id)
        .await?;
    redirect("/")
}

async fn update_user_page(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> HandlerResult {
    let user = state.user_service.find_user(actor).await?;
    let form = ProfileForm {
        username: user.username.as_str().to_owned(),
        email: user.email.as_ref().map(|email| email.as_str().to_owned()),
    };
    page(
        &state,
        views::UPDATE_USER,
        Page::new(Some(actor), json!({ "form": form })),
    )
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Form(form): Form<ProfileForm>,
) -> HandlerResult {
    match state
        .user_service
        .update_profile(
            actor,
            UpdateProfileRequest {
                username: form.username.clone(),
                email: form.email.clone(),
            },
        )
        .await
    {
        Ok(user) => redirect(&format!("/profile/{}", user.id)),
        Err(error) => rerender(
            &state,
            error,
            views::UPDATE_USER,
            Page::new(Some(actor), json!({ "form": form })),
        ),
    }
}

async fn topics(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<SearchQuery>,
) -> HandlerResult {
    let term = SearchTerm::from_query(query.q);
    let topics = state.search_service.topics(term.clone()).await?;
    let total_room_count = state.search_service.total_room_count().await?;
    page(
        &state,
        views::TOPICS,
        Page::new(
            user,
            json!({
                "query": term.as_str(),
                "topics": topics,
                "total_room_count": total_room_count,
            }),
        ),
    )
}

async fn activity(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> HandlerResult {
    let messages = state.search_service.activity().await?;
    page(
        &state,
        views::ACTIVITY,
        Page::new(user, json!({ "messages": messages })),
    )
}
