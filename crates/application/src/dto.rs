//! 视图读模型，交给渲染层序列化。

use domain::{Room, Timestamp, Topic, User};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
            email: user.email.as_ref().map(|email| email.as_str().to_owned()),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Topic> for TopicRef {
    fn from(topic: &Topic) -> Self {
        Self {
            id: Uuid::from(topic.id),
            name: topic.name.as_str().to_owned(),
        }
    }
}

/// 话题及其下的房间数量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDto {
    pub id: Uuid,
    pub name: String,
    pub room_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Room> for RoomRef {
    fn from(room: &Room) -> Self {
        Self {
            id: Uuid::from(room.id),
            name: room.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub topic: TopicRef,
    pub host: UserRef,
    pub participant_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub body: String,
    pub author: UserRef,
    pub room: RoomRef,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomDetail {
    pub room: RoomDto,
    pub messages: Vec<MessageDto>,
    pub participants: Vec<UserRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub query: String,
    pub rooms: Vec<RoomDto>,
    pub room_count: usize,
    pub topics: Vec<TopicDto>,
    pub total_room_count: u64,
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: UserDto,
    pub rooms: Vec<RoomDto>,
    pub messages: Vec<MessageDto>,
    pub topics: Vec<TopicDto>,
    pub total_room_count: u64,
}
