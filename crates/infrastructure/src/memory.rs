//! 进程内存储，语义与 PostgreSQL 实现保持一致：
//! 用户名、话题名唯一，删除房间级联删除消息与参与者，参与者为集合。

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use application::repository::{
    MessageRepository, RoomRepository, TopicRepository, UserRepository,
};
use async_trait::async_trait;
use domain::{
    Message, MessageId, RepositoryError, Room, RoomId, SearchTerm, Topic, TopicId, User, UserId,
    Username,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    topics: Vec<Topic>,
    rooms: Vec<Room>,
    participants: HashMap<RoomId, Vec<UserId>>,
    messages: Vec<Message>,
}

impl MemoryState {
    fn topic_name(&self, id: TopicId) -> Option<&str> {
        self.topics
            .iter()
            .find(|topic| topic.id == id)
            .map(|topic| topic.name.as_str())
    }

    fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    /// 最近更新的在前；时间相同时后插入的在前。
    fn rooms_newest_first(&self, filter: impl Fn(&Room) -> bool) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .rev()
            .filter(|room| filter(room))
            .cloned()
            .collect();
        rooms.sort_by_key(|room| Reverse((room.updated_at, room.created_at)));
        rooms
    }

    /// 从新到旧；时间相同时后插入的在前。
    fn messages_newest_first(&self, filter: impl Fn(&Message) -> bool) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .rev()
            .filter(|message| filter(message))
            .cloned()
            .collect();
        messages.sort_by_key(|message| Reverse(message.created_at));
        messages
    }
}

type SharedState = Arc<RwLock<MemoryState>>;

#[derive(Clone)]
pub struct MemoryUserRepository {
    state: SharedState,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|existing| existing.id == user.id || existing.username == user.username)
        {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .users
            .values()
            .any(|existing| existing.id != user.id && existing.username == user.username)
        {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| &user.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }
}

#[derive(Clone)]
pub struct MemoryTopicRepository {
    state: SharedState,
}

#[async_trait]
impl TopicRepository for MemoryTopicRepository {
    async fn get_or_create(&self, candidate: Topic) -> Result<Topic, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .topics
            .iter()
            .find(|topic| topic.name == candidate.name)
        {
            return Ok(existing.clone());
        }
        state.topics.push(candidate.clone());
        Ok(candidate)
    }

    async fn search(
        &self,
        term: &SearchTerm,
        limit: Option<u32>,
    ) -> Result<Vec<Topic>, RepositoryError> {
        let state = self.state.read().await;
        let mut topics: Vec<Topic> = state
            .topics
            .iter()
            .filter(|topic| term.matches(topic.name.as_str()))
            .cloned()
            .collect();
        topics.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.as_str().cmp(b.name.as_str()))
        });
        if let Some(limit) = limit {
            topics.truncate(limit as usize);
        }
        Ok(topics)
    }

    async fn find_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Topic>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .topics
            .iter()
            .filter(|topic| ids.contains(&topic.id))
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub struct MemoryRoomRepository {
    state: SharedState,
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut state = self.state.write().await;
        if state.room(room.id).is_some() {
            return Err(RepositoryError::Conflict);
        }
        if !state.users.contains_key(&room.host_id) || state.topic_name(room.topic_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.rooms.push(room.clone());
        Ok(room)
    }

    async fn update(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut state = self.state.write().await;
        if state.topic_name(room.topic_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let stored = state
            .rooms
            .iter_mut()
            .find(|existing| existing.id == room.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.topic_id = room.topic_id;
        stored.name = room.name;
        stored.description = room.description;
        stored.updated_at = room.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: RoomId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.rooms.len();
        state.rooms.retain(|room| room.id != id);
        if state.rooms.len() == before {
            return Err(RepositoryError::NotFound);
        }
        state.messages.retain(|message| message.room_id != id);
        state.participants.remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        Ok(self.state.read().await.room(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[RoomId]) -> Result<Vec<Room>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .iter()
            .filter(|room| ids.contains(&room.id))
            .cloned()
            .collect())
    }

    async fn search(&self, term: &SearchTerm) -> Result<Vec<Room>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.rooms_newest_first(|room| {
            let topic_name = state.topic_name(room.topic_id).unwrap_or_default();
            term.matches_room(room, topic_name)
        }))
    }

    async fn list_by_host(&self, host_id: UserId) -> Result<Vec<Room>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.rooms_newest_first(|room| room.host_id == host_id))
    }

    async fn list_participants(&self, id: RoomId) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.participants.get(&id).cloned().unwrap_or_default())
    }

    async fn participant_counts(
        &self,
        ids: &[RoomId],
    ) -> Result<HashMap<RoomId, u64>, RepositoryError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .participants
                    .get(id)
                    .map(|users| (*id, users.len() as u64))
            })
            .collect())
    }

    async fn room_counts_by_topic(
        &self,
        ids: &[TopicId],
    ) -> Result<HashMap<TopicId, u64>, RepositoryError> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for room in state.rooms.iter().filter(|room| ids.contains(&room.topic_id)) {
            *counts.entry(room.topic_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.read().await.rooms.len() as u64)
    }
}

#[derive(Clone)]
pub struct MemoryMessageRepository {
    state: SharedState,
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create_with_participant(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut state = self.state.write().await;
        if state.room(message.room_id).is_none() || !state.users.contains_key(&message.user_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.messages.iter().any(|existing| existing.id == message.id) {
            return Err(RepositoryError::Conflict);
        }

        state.messages.push(message.clone());
        let participants = state.participants.entry(message.room_id).or_default();
        if !participants.contains(&message.user_id) {
            participants.push(message.user_id);
        }
        Ok(message)
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.messages.len();
        state.messages.retain(|message| message.id != id);
        if state.messages.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .iter()
            .find(|message| message.id == id)
            .cloned())
    }

    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|message| message.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }

    async fn list_by_author(&self, user_id: UserId) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.messages_newest_first(|message| message.user_id == user_id))
    }

    async fn search_by_topic(&self, term: &SearchTerm) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.messages_newest_first(|message| {
            state
                .room(message.room_id)
                .and_then(|room| state.topic_name(room.topic_id))
                .is_some_and(|name| term.matches(name))
        }))
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.messages_newest_first(|_| true))
    }
}

/// 共享同一份状态的仓储集合，对应 `PgStorage`。
#[derive(Clone)]
pub struct MemoryStorage {
    pub user_repository: Arc<MemoryUserRepository>,
    pub topic_repository: Arc<MemoryTopicRepository>,
    pub room_repository: Arc<MemoryRoomRepository>,
    pub message_repository: Arc<MemoryMessageRepository>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let state: SharedState = Arc::new(RwLock::new(MemoryState::default()));
        Self {
            user_repository: Arc::new(MemoryUserRepository {
                state: state.clone(),
            }),
            topic_repository: Arc::new(MemoryTopicRepository {
                state: state.clone(),
            }),
            room_repository: Arc::new(MemoryRoomRepository {
                state: state.clone(),
            }),
            message_repository: Arc::new(MemoryMessageRepository { state }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
