use crate::errors::DomainError;
use crate::value_objects::{RoomId, Timestamp, TopicId, UserId};

const ROOM_NAME_MAX_LEN: usize = 200;

/// 讨论房间：归属一个话题，由房主独占修改与删除。
///
/// 参与者集合不在实体内维护，由仓储在发帖时一并记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub host_id: UserId,
    pub topic_id: TopicId,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Room {
    pub fn open(
        id: RoomId,
        host_id: UserId,
        topic_id: TopicId,
        name: impl Into<String>,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name.into())?;
        Ok(Self {
            id,
            host_id,
            topic_id,
            name,
            description: description.into().trim().to_owned(),
            created_at: now,
            updated_at: now,
        })
    }

    /// 覆盖话题、名称与描述。
    pub fn revise(
        &mut self,
        topic_id: TopicId,
        name: impl Into<String>,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.name = Self::validate_name(name.into())?;
        self.topic_id = topic_id;
        self.description = description.into().trim().to_owned();
        self.updated_at = now;
        Ok(())
    }

    fn validate_name(name: String) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        if trimmed.chars().count() > ROOM_NAME_MAX_LEN {
            return Err(DomainError::invalid_argument("name", "too long"));
        }
        Ok(trimmed.to_owned())
    }
}
