//! 用例服务集成测试
//!
//! 覆盖话题复用、参与者集合、所有权校验、级联删除、搜索与登录失败等行为。

use application::{ApplicationError, AuthenticateUserRequest, RoomDraft, TopicRepository};
use domain::{DomainError, SearchTerm, Topic, TopicId, TopicName};
use tests::{TestDataFactory, TestEnvironment, TEST_PASSWORD};
use time::OffsetDateTime;

fn is_forbidden(result: Result<impl Sized, ApplicationError>) -> bool {
    matches!(
        result,
        Err(ApplicationError::Domain(DomainError::OperationNotAllowed))
    )
}

#[tokio::test]
async fn topic_get_or_create_is_idempotent() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();

    let first = factory.create_room(&alice, "Python", "Intro").await.unwrap();
    let second = factory.create_room(&alice, "Python", "Advanced").await.unwrap();
    assert_eq!(first.topic_id, second.topic_id);

    let direct = env
        .storage
        .topic_repository
        .get_or_create(Topic::new(
            TopicId::generate(),
            TopicName::parse("Python").unwrap(),
            OffsetDateTime::now_utc(),
        ))
        .await
        .unwrap();
    assert_eq!(direct.id, first.topic_id);

    let topics = env.search_service.all_topics().await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].room_count, 2);
}

#[tokio::test]
async fn posting_adds_author_to_participants_once() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let bob = factory.create_user("bob").await.unwrap();
    let room = factory.create_room(&alice, "Python", "Intro").await.unwrap();

    factory.post(&bob, &room, "hi").await.unwrap();
    factory.post(&bob, &room, "hi").await.unwrap();

    let detail = env.room_service.room_detail(room.id).await.unwrap();
    assert_eq!(detail.messages.len(), 2);
    assert_eq!(detail.participants.len(), 1);
    assert_eq!(detail.participants[0].username, "bob");
    assert_eq!(detail.room.participant_count, 1);
}

#[tokio::test]
async fn non_owners_cannot_change_anything() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let bob = factory.create_user("bob").await.unwrap();
    let room = factory.create_room(&alice, "Python", "Intro").await.unwrap();
    let message = factory.post(&alice, &room, "mine").await.unwrap();

    let update = env
        .room_service
        .update_room(
            bob.id,
            room.id,
            RoomDraft {
                topic: "Rust".into(),
                name: "Hijacked".into(),
                description: String::new(),
            },
        )
        .await;
    assert!(is_forbidden(update));
    assert!(is_forbidden(env.room_service.delete_room(bob.id, room.id).await));
    assert!(is_forbidden(
        env.room_service.delete_message(bob.id, message.id).await
    ));
    assert!(is_forbidden(
        env.room_service.editable_room(bob.id, room.id).await
    ));

    let detail = env.room_service.room_detail(room.id).await.unwrap();
    assert_eq!(detail.room.name, "Intro");
    assert_eq!(detail.room.topic.name, "Python");
    assert_eq!(detail.messages.len(), 1);
    // 失败的编辑不会留下新话题
    assert_eq!(env.search_service.all_topics().await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_room_removes_its_messages() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let bob = factory.create_user("bob").await.unwrap();
    let room = factory.create_room(&alice, "Python", "Intro").await.unwrap();
    factory.post(&alice, &room, "one").await.unwrap();
    factory.post(&bob, &room, "two").await.unwrap();

    env.room_service.delete_room(alice.id, room.id).await.unwrap();

    assert!(matches!(
        env.room_service.room_detail(room.id).await,
        Err(ApplicationError::Domain(DomainError::RoomNotFound))
    ));
    assert!(env.search_service.activity().await.unwrap().is_empty());
    let profile = env.search_service.profile(bob.id).await.unwrap();
    assert!(profile.messages.is_empty());
}

#[tokio::test]
async fn search_matches_topic_name_room_name_or_description() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let intro = factory.create_room(&alice, "Python", "Intro").await.unwrap();
    let web = factory.create_room(&alice, "Python", "Web").await.unwrap();
    let borrow = factory
        .create_room_with_description(&alice, "Rust", "Ownership", "talk about the borrow checker")
        .await
        .unwrap();
    factory.post(&alice, &intro, "hello python").await.unwrap();
    factory.post(&alice, &borrow, "hello rust").await.unwrap();

    let everything = env.search_service.home(SearchTerm::everything()).await.unwrap();
    assert_eq!(everything.room_count, 3);
    assert_eq!(everything.messages.len(), 2);

    let python = env.search_service.home(SearchTerm::new("PYTH")).await.unwrap();
    let mut names: Vec<_> = python.rooms.iter().map(|room| room.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Intro", "Web"]);
    assert_eq!(python.room_count, 2);
    assert_eq!(python.total_room_count, 3);
    assert_eq!(python.messages.len(), 1);
    assert_eq!(python.messages[0].body, "hello python");
    assert!(python.rooms.iter().all(|room| room.id != borrow.id.0));
    assert!(python.rooms.iter().any(|room| room.id == web.id.0));

    let by_description = env.search_service.home(SearchTerm::new("borrow")).await.unwrap();
    assert_eq!(by_description.room_count, 1);
    // 首页消息只按话题名匹配
    assert!(by_description.messages.is_empty());

    let literal = env.search_service.home(SearchTerm::new("%")).await.unwrap();
    assert_eq!(literal.room_count, 0);
}

#[tokio::test]
async fn bob_joins_alices_python_room() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let bob = factory.create_user("bob").await.unwrap();
    let room = factory.create_room(&alice, "Python", "Intro").await.unwrap();

    factory.post(&bob, &room, "hi").await.unwrap();

    let detail = env.room_service.room_detail(room.id).await.unwrap();
    let participants: Vec<_> = detail
        .participants
        .iter()
        .map(|user| user.username.as_str())
        .collect();
    assert_eq!(participants, vec!["bob"]);
    assert_eq!(detail.room.host.username, "alice");

    let topics = env.search_service.topics(SearchTerm::new("python")).await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].room_count, 1);
}

#[tokio::test]
async fn forbidden_delete_leaves_room_in_place() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let bob = factory.create_user("bob").await.unwrap();
    let room = factory.create_room(&alice, "Python", "Intro").await.unwrap();

    assert!(is_forbidden(env.room_service.delete_room(bob.id, room.id).await));
    assert!(env.room_service.room_detail(room.id).await.is_ok());
    assert_eq!(env.search_service.total_room_count().await.unwrap(), 1);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    factory.create_user("alice").await.unwrap();

    let result = env
        .user_service
        .authenticate(AuthenticateUserRequest {
            username: "alice".into(),
            password: "not-the-password".into(),
        })
        .await;
    assert!(matches!(result, Err(ApplicationError::Authentication)));

    let user = env
        .user_service
        .authenticate(AuthenticateUserRequest {
            username: "alice".into(),
            password: TEST_PASSWORD.into(),
        })
        .await
        .unwrap();
    assert_eq!(user.username.as_str(), "alice");
}

#[tokio::test]
async fn rooms_and_messages_are_ordered() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();
    let older = factory.create_room(&alice, "Python", "Older").await.unwrap();
    let newer = factory.create_room(&alice, "Python", "Newer").await.unwrap();
    factory.post(&alice, &older, "first").await.unwrap();
    factory.post(&alice, &older, "second").await.unwrap();

    let home = env.search_service.home(SearchTerm::everything()).await.unwrap();
    assert_eq!(home.rooms[0].id, newer.id.0);

    let detail = env.room_service.room_detail(older.id).await.unwrap();
    assert_eq!(detail.messages[0].body, "first");
    assert_eq!(detail.messages[1].body, "second");

    let activity = env.search_service.activity().await.unwrap();
    assert_eq!(activity[0].body, "second");
}

#[tokio::test]
async fn home_sidebar_shows_first_five_topics_regardless_of_term() {
    let env = TestEnvironment::new();
    let factory = TestDataFactory::new(env.clone());
    let alice = factory.create_user("alice").await.unwrap();

    let created = ["Gamma", "Alpha", "Zeta", "Beta", "Eta", "Delta", "Epsilon"];
    for topic in created {
        factory
            .create_room(&alice, topic, &format!("{topic} room"))
            .await
            .unwrap();
    }

    let home = env
        .search_service
        .home(SearchTerm::new("zzz-nomatch"))
        .await
        .unwrap();
    assert_eq!(home.room_count, 0);
    let sidebar: Vec<_> = home.topics.iter().map(|topic| topic.name.as_str()).collect();
    assert_eq!(sidebar, created[..5].to_vec());

    let unfiltered = env.search_service.home(SearchTerm::everything()).await.unwrap();
    let sidebar: Vec<_> = unfiltered
        .topics
        .iter()
        .map(|topic| topic.name.as_str())
        .collect();
    assert_eq!(sidebar, created[..5].to_vec());

    let all: Vec<_> = env
        .search_service
        .topics(SearchTerm::everything())
        .await
        .unwrap()
        .into_iter()
        .map(|topic| topic.name)
        .collect();
    assert_eq!(all, created.to_vec());

    let filtered = env.search_service.topics(SearchTerm::new("eta")).await.unwrap();
    let names: Vec<_> = filtered.iter().map(|topic| topic.name.as_str()).collect();
    assert_eq!(names, vec!["Zeta", "Beta", "Eta"]);
}
