use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    Message, MessageId, RepositoryError, Room, RoomId, SearchTerm, Topic, TopicId, User, UserId,
    Username,
};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 用户名重复时返回 `RepositoryError::Conflict`。
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError>;
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// 单条条件插入：同名话题已存在时返回已有记录，候选记录被丢弃。
    async fn get_or_create(&self, candidate: Topic) -> Result<Topic, RepositoryError>;

    /// 按插入顺序返回名称命中的话题。
    async fn search(
        &self,
        term: &SearchTerm,
        limit: Option<u32>,
    ) -> Result<Vec<Topic>, RepositoryError>;

    async fn find_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Topic>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn update(&self, room: Room) -> Result<Room, RepositoryError>;

    /// 硬删除，级联删除房间内的消息和参与者记录。
    async fn delete(&self, id: RoomId) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    async fn find_by_ids(&self, ids: &[RoomId]) -> Result<Vec<Room>, RepositoryError>;

    /// 话题名、房间名、描述任意一项不区分大小写命中，最近更新的在前。
    async fn search(&self, term: &SearchTerm) -> Result<Vec<Room>, RepositoryError>;

    async fn list_by_host(&self, host_id: UserId) -> Result<Vec<Room>, RepositoryError>;
    async fn list_participants(&self, id: RoomId) -> Result<Vec<UserId>, RepositoryError>;
    async fn participant_counts(
        &self,
        ids: &[RoomId],
    ) -> Result<HashMap<RoomId, u64>, RepositoryError>;
    async fn room_counts_by_topic(
        &self,
        ids: &[TopicId],
    ) -> Result<HashMap<TopicId, u64>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 原子地保存消息并把作者加入房间参与者集合（已存在则不变）。
    async fn create_with_participant(&self, message: Message) -> Result<Message, RepositoryError>;

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// 房间内的全部消息，从旧到新。
    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError>;

    /// 以下列表均为从新到旧。
    async fn list_by_author(&self, user_id: UserId) -> Result<Vec<Message>, RepositoryError>;
    async fn search_by_topic(&self, term: &SearchTerm) -> Result<Vec<Message>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError>;
}
