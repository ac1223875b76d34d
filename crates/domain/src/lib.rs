//! 讨论室系统核心领域模型
//!
//! 包含用户、话题、房间、消息等核心实体，以及所有权校验与搜索匹配规则。

pub mod errors;
pub mod message;
pub mod policy;
pub mod room;
pub mod search;
pub mod topic;
pub mod user;
pub mod value_objects;

pub use errors::{DomainError, RepositoryError};
pub use message::Message;
pub use policy::{can_mutate, ensure_can_mutate, Owned};
pub use room::Room;
pub use search::SearchTerm;
pub use topic::Topic;
pub use user::User;
pub use value_objects::{
    MessageBody, MessageId, PasswordHash, RoomId, Timestamp, TopicId, TopicName, UserEmail,
    UserId, Username,
};
