use crate::value_objects::{MessageBody, MessageId, RoomId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub body: MessageBody,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    pub fn post(
        id: MessageId,
        room_id: RoomId,
        user_id: UserId,
        body: MessageBody,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            user_id,
            body,
            created_at: now,
            updated_at: now,
        }
    }
}
