use crate::value_objects::{Timestamp, TopicId, TopicName};

/// 话题：房间的去重分类标签，首次使用时惰性创建。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub name: TopicName,
    pub created_at: Timestamp,
}

impl Topic {
    pub fn new(id: TopicId, name: TopicName, created_at: Timestamp) -> Self {
        Self {
            id,
            name,
            created_at,
        }
    }
}
