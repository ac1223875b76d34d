mod support;

use axum::http::StatusCode;
use support::{build_app, Browser, PASSWORD};
use web_api::FORBIDDEN_MESSAGE;

#[tokio::test]
async fn health_check_is_public() {
    let mut browser = Browser::new(build_app());
    let response = browser.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login_with_next() {
    let mut browser = Browser::new(build_app());

    let response = browser.get("/create-room").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/login?next=/create-room"));

    let response = browser.post("/room/00000000-0000-0000-0000-000000000000", &[("body", "hi")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response
        .location
        .as_deref()
        .is_some_and(|location| location.starts_with("/login?next=")));
}

#[tokio::test]
async fn register_create_room_and_post_message() {
    let mut browser = Browser::new(build_app());

    let response = browser.register("Alice").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));
    assert!(browser.has_session());

    let response = browser.create_room("Python", "Intro").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let home = browser.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    let context = home.context();
    assert_eq!(home.json()["view"], "base/home");
    assert!(context["current_user"].is_string());
    assert_eq!(context["room_count"], 1);
    assert_eq!(context["rooms"][0]["name"], "Intro");
    assert_eq!(context["rooms"][0]["topic"]["name"], "Python");
    assert_eq!(context["rooms"][0]["host"]["username"], "alice");

    let room_id = browser.first_room_id().await;
    let response = browser
        .post(&format!("/room/{room_id}"), &[("body", "hello")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location, Some(format!("/room/{room_id}")));

    let room = browser.get(&format!("/room/{room_id}")).await;
    let context = room.context();
    assert_eq!(context["messages"][0]["body"], "hello");
    assert_eq!(context["participants"][0]["username"], "alice");
    assert_eq!(context["room"]["participant_count"], 1);

    let activity = browser.get("/activity").await;
    assert_eq!(activity.context()["messages"][0]["body"], "hello");
}

#[tokio::test]
async fn empty_message_re_renders_room_with_error() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;
    browser.create_room("Python", "Intro").await;
    let room_id = browser.first_room_id().await;

    let response = browser
        .post(&format!("/room/{room_id}"), &[("body", "")])
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["view"], "base/room");
    assert!(response.json()["messages"][0].is_string());
    assert_eq!(response.context()["messages"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn wrong_password_shows_login_error() {
    let app = build_app();
    let mut alice = Browser::new(app.clone());
    alice.register("alice").await;

    let mut visitor = Browser::new(app);
    let response = visitor
        .post("/login", &[("username", "alice"), ("password", "wrong-password")])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["view"], "base/login_register");
    assert_eq!(
        response.json()["messages"][0],
        "Username OR password does not exist"
    );
    assert!(!visitor.has_session());

    let response = visitor
        .post("/login", &[("username", "nobody"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_honours_local_next_only() {
    let app = build_app();
    Browser::new(app.clone()).register("alice").await;

    let mut browser = Browser::new(app.clone());
    let response = browser
        .post(
            "/login?next=/create-room",
            &[("username", "alice"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/create-room"));

    let mut browser = Browser::new(app);
    let response = browser
        .post(
            "/login",
            &[
                ("username", "alice"),
                ("password", PASSWORD),
                ("next", "//evil.example"),
            ],
        )
        .await;
    assert_eq!(response.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn signed_in_user_skips_login_and_register_pages() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;

    for page in ["/login", "/register"] {
        let response = browser.get(page).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location.as_deref(), Some("/"));
    }
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = build_app();
    Browser::new(app.clone()).register("alice").await;

    let mut browser = Browser::new(app);
    let response = browser.register("Alice").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.context()["username"], "Alice");
    assert!(!browser.has_session());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;

    let response = browser.post("/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));

    let response = browser.get("/create-room").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/login?next=/create-room"));

    let response = browser.post("/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_by_get_is_refused_and_keeps_the_session() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;

    let response = browser.get("/logout").await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(browser.has_session());

    let response = browser.get("/create-room").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn non_host_is_forbidden_from_editing_or_deleting() {
    let app = build_app();
    let mut host = Browser::new(app.clone());
    host.register("alice").await;
    host.create_room("Python", "Intro").await;
    let room_id = host.first_room_id().await;

    let mut other = Browser::new(app);
    other.register("bob").await;

    for uri in [
        format!("/update-room/{room_id}"),
        format!("/delete-room/{room_id}"),
    ] {
        let response = other.get(&uri).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.text, FORBIDDEN_MESSAGE);
    }

    let response = other
        .post(
            &format!("/update-room/{room_id}"),
            &[("topic", "Rust"), ("name", "Hijacked"), ("description", "")],
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let room = other.get(&format!("/room/{room_id}")).await;
    assert_eq!(room.context()["room"]["name"], "Intro");
}

#[tokio::test]
async fn host_updates_room_and_topic() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;
    browser.create_room("Python", "Intro").await;
    let room_id = browser.first_room_id().await;

    let form = browser.get(&format!("/update-room/{room_id}")).await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.context()["form"]["topic"], "Python");

    let response = browser
        .post(
            &format!("/update-room/{room_id}"),
            &[("topic", "Rust"), ("name", "Ownership"), ("description", "")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let room = browser.get(&format!("/room/{room_id}")).await;
    assert_eq!(room.context()["room"]["name"], "Ownership");
    assert_eq!(room.context()["room"]["topic"]["name"], "Rust");

    let topics = browser.get("/topics?q=rus").await;
    let context = topics.context();
    assert_eq!(context["topics"].as_array().map(Vec::len), Some(1));
    assert_eq!(context["topics"][0]["room_count"], 1);
}

#[tokio::test]
async fn room_deletion_requires_a_fresh_confirmation() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;
    browser.create_room("Python", "Intro").await;
    let room_id = browser.first_room_id().await;
    let uri = format!("/delete-room/{room_id}");

    let response = browser.post(&uri, &[]).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        browser.get(&format!("/room/{room_id}")).await.status,
        StatusCode::OK
    );

    let page = browser.get(&uri).await;
    assert_eq!(page.json()["view"], "base/delete");
    assert_eq!(page.context()["obj"]["name"], "Intro");
    let token = page.context()["token"]
        .as_str()
        .expect("token")
        .to_owned();

    let response = browser.post(&uri, &[("token", "stale")]).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    // 失败的提交会作废旧令牌
    let response = browser.post(&uri, &[("token", &token)]).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let token = response.context()["token"]
        .as_str()
        .expect("fresh token")
        .to_owned();

    let response = browser.post(&uri, &[("token", &token)]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));

    assert_eq!(
        browser.get(&format!("/room/{room_id}")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        browser.post(&uri, &[("token", &token)]).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn only_author_deletes_message() {
    let app = build_app();
    let mut alice = Browser::new(app.clone());
    alice.register("alice").await;
    alice.create_room("Python", "Intro").await;
    let room_id = alice.first_room_id().await;
    alice
        .post(&format!("/room/{room_id}"), &[("body", "mine")])
        .await;

    let room = alice.get(&format!("/room/{room_id}")).await;
    let message_id = room.context()["messages"][0]["id"]
        .as_str()
        .expect("message id")
        .to_owned();
    let uri = format!("/delete-message/{message_id}");

    let mut bob = Browser::new(app);
    bob.register("bob").await;
    let response = bob.get(&uri).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.text, FORBIDDEN_MESSAGE);

    let page = alice.get(&uri).await;
    assert_eq!(page.context()["obj"]["body"], "mine");
    let token = page.context()["token"].as_str().expect("token").to_owned();
    let response = alice.post(&uri, &[("token", &token)]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let room = alice.get(&format!("/room/{room_id}")).await;
    assert_eq!(room.context()["messages"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn malformed_or_unknown_ids_are_not_found() {
    let mut browser = Browser::new(build_app());

    assert_eq!(browser.get("/room/not-a-uuid").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        browser
            .get("/profile/00000000-0000-0000-0000-000000000000")
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn profile_update_changes_username() {
    let mut browser = Browser::new(build_app());
    browser.register("alice").await;

    let form = browser.get("/update-user").await;
    assert_eq!(form.context()["form"]["username"], "alice");

    let response = browser
        .post(
            "/update-user",
            &[("username", "alicia"), ("email", "alicia@example.com")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location.expect("profile location");
    assert!(location.starts_with("/profile/"));

    let profile = browser.get(&location).await;
    assert_eq!(profile.context()["user"]["username"], "alicia");
    assert_eq!(profile.context()["user"]["email"], "alicia@example.com");
}
