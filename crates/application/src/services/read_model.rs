//! 把仓储返回的实体批量拼装为视图读模型。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Message, Room, RoomId, Topic, TopicId, User, UserId};
use uuid::Uuid;

use crate::{
    dto::{MessageDto, RoomDto, RoomRef, TopicDto, TopicRef, UserRef},
    error::ApplicationError,
    repository::{RoomRepository, TopicRepository, UserRepository},
};

#[derive(Clone)]
pub(crate) struct ReadModels {
    pub(crate) user_repository: Arc<dyn UserRepository>,
    pub(crate) topic_repository: Arc<dyn TopicRepository>,
    pub(crate) room_repository: Arc<dyn RoomRepository>,
}

fn unique<T: Copy + Eq + std::hash::Hash>(ids: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

impl ReadModels {
    async fn users_by_id(&self, ids: Vec<UserId>) -> Result<HashMap<UserId, User>, ApplicationError> {
        let users = self.user_repository.find_by_ids(&unique(ids)).await?;
        Ok(users.into_iter().map(|user| (user.id, user)).collect())
    }

    pub(crate) async fn rooms(&self, rooms: Vec<Room>) -> Result<Vec<RoomDto>, ApplicationError> {
        if rooms.is_empty() {
            return Ok(Vec::new());
        }

        let hosts = self
            .users_by_id(rooms.iter().map(|room| room.host_id).collect())
            .await?;
        let topic_ids = unique(rooms.iter().map(|room| room.topic_id));
        let topics: HashMap<TopicId, Topic> = self
            .topic_repository
            .find_by_ids(&topic_ids)
            .await?
            .into_iter()
            .map(|topic| (topic.id, topic))
            .collect();
        let room_ids: Vec<RoomId> = rooms.iter().map(|room| room.id).collect();
        let participant_counts = self.room_repository.participant_counts(&room_ids).await?;

        let items = rooms
            .into_iter()
            .filter_map(|room| {
                let (Some(host), Some(topic)) = (hosts.get(&room.host_id), topics.get(&room.topic_id))
                else {
                    tracing::warn!(room_id = %room.id, "room references missing host or topic");
                    return None;
                };
                Some(RoomDto {
                    id: Uuid::from(room.id),
                    topic: TopicRef::from(topic),
                    host: UserRef::from(host),
                    participant_count: participant_counts.get(&room.id).copied().unwrap_or(0),
                    name: room.name,
                    description: room.description,
                    created_at: room.created_at,
                    updated_at: room.updated_at,
                })
            })
            .collect();
        Ok(items)
    }

    pub(crate) async fn messages(
        &self,
        messages: Vec<Message>,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let authors = self
            .users_by_id(messages.iter().map(|message| message.user_id).collect())
            .await?;
        let room_ids = unique(messages.iter().map(|message| message.room_id));
        let rooms: HashMap<RoomId, Room> = self
            .room_repository
            .find_by_ids(&room_ids)
            .await?
            .into_iter()
            .map(|room| (room.id, room))
            .collect();

        let items = messages
            .into_iter()
            .filter_map(|message| {
                let (Some(author), Some(room)) =
                    (authors.get(&message.user_id), rooms.get(&message.room_id))
                else {
                    tracing::warn!(message_id = %message.id, "message references missing author or room");
                    return None;
                };
                Some(MessageDto {
                    id: Uuid::from(message.id),
                    body: message.body.as_str().to_owned(),
                    author: UserRef::from(author),
                    room: RoomRef::from(room),
                    created_at: message.created_at,
                })
            })
            .collect();
        Ok(items)
    }

    pub(crate) async fn topics(&self, topics: Vec<Topic>) -> Result<Vec<TopicDto>, ApplicationError> {
        let ids: Vec<TopicId> = topics.iter().map(|topic| topic.id).collect();
        let counts = if ids.is_empty() {
            HashMap::new()
        } else {
            self.room_repository.room_counts_by_topic(&ids).await?
        };

        Ok(topics
            .into_iter()
            .map(|topic| TopicDto {
                id: Uuid::from(topic.id),
                room_count: counts.get(&topic.id).copied().unwrap_or(0),
                name: topic.name.as_str().to_owned(),
            })
            .collect())
    }

    /// 按给定顺序返回用户引用，缺失的用户被跳过。
    pub(crate) async fn user_refs(&self, ids: Vec<UserId>) -> Result<Vec<UserRef>, ApplicationError> {
        let users = self.users_by_id(ids.clone()).await?;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(UserRef::from))
            .collect())
    }
}
