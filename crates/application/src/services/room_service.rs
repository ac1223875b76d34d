use std::sync::Arc;

use domain::{
    ensure_can_mutate, DomainError, Message, MessageBody, MessageId, RepositoryError, Room,
    RoomId, Topic, TopicId, TopicName, UserId,
};

use crate::{
    clock::Clock,
    dto::{MessageDto, RoomDetail, RoomDto, RoomRef},
    error::ApplicationError,
    repository::{MessageRepository, RoomRepository, TopicRepository, UserRepository},
    services::read_model::ReadModels,
};

/// 创建/编辑房间表单提交的字段。
#[derive(Debug, Clone, Default)]
pub struct RoomDraft {
    pub topic: String,
    pub name: String,
    pub description: String,
}

pub struct RoomServiceDependencies {
    pub room_repository: Arc<dyn RoomRepository>,
    pub topic_repository: Arc<dyn TopicRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct RoomService {
    deps: RoomServiceDependencies,
    read_models: ReadModels,
}

fn room_missing(err: RepositoryError) -> ApplicationError {
    match err {
        RepositoryError::NotFound => ApplicationError::Domain(DomainError::RoomNotFound),
        other => ApplicationError::Repository(other),
    }
}

fn message_missing(err: RepositoryError) -> ApplicationError {
    match err {
        RepositoryError::NotFound => ApplicationError::Domain(DomainError::MessageNotFound),
        other => ApplicationError::Repository(other),
    }
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        let read_models = ReadModels {
            user_repository: deps.user_repository.clone(),
            topic_repository: deps.topic_repository.clone(),
            room_repository: deps.room_repository.clone(),
        };
        Self { deps, read_models }
    }

    async fn load_room(&self, room_id: RoomId) -> Result<Room, ApplicationError> {
        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::RoomNotFound))
    }

    async fn load_message(&self, message_id: MessageId) -> Result<Message, ApplicationError> {
        self.deps
            .message_repository
            .find_by_id(message_id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::MessageNotFound))
    }

    fn authorize<R: domain::Owned>(
        &self,
        actor: UserId,
        resource: &R,
        what: &'static str,
    ) -> Result<(), ApplicationError> {
        ensure_can_mutate(actor, resource).map_err(|err| {
            tracing::warn!(actor = %actor, owner = %resource.owner_id(), resource = what, "forbidden mutation attempt");
            ApplicationError::from(err)
        })
    }

    /// 名称校验通过后再解析话题，避免无效表单留下孤立话题。
    async fn resolve_topic(&self, topic: TopicName) -> Result<TopicId, ApplicationError> {
        let candidate = Topic::new(TopicId::generate(), topic, self.deps.clock.now());
        let stored = self.deps.topic_repository.get_or_create(candidate).await?;
        Ok(stored.id)
    }

    pub async fn create_room(
        &self,
        actor: UserId,
        draft: RoomDraft,
    ) -> Result<Room, ApplicationError> {
        let topic = TopicName::parse(draft.topic)?;
        let mut room = Room::open(
            RoomId::generate(),
            actor,
            TopicId::generate(),
            draft.name,
            draft.description,
            self.deps.clock.now(),
        )?;
        room.topic_id = self.resolve_topic(topic).await?;

        let stored = self.deps.room_repository.create(room).await?;
        tracing::info!(room_id = %stored.id, host_id = %actor, "room created");
        Ok(stored)
    }

    /// 编辑表单的预填数据；仅房主可见。
    pub async fn editable_room(
        &self,
        actor: UserId,
        room_id: RoomId,
    ) -> Result<RoomDto, ApplicationError> {
        let room = self.load_room(room_id).await?;
        self.authorize(actor, &room, "room")?;
        self.read_models
            .rooms(vec![room])
            .await?
            .pop()
            .ok_or(ApplicationError::Domain(DomainError::RoomNotFound))
    }

    pub async fn update_room(
        &self,
        actor: UserId,
        room_id: RoomId,
        draft: RoomDraft,
    ) -> Result<Room, ApplicationError> {
        let mut room = self.load_room(room_id).await?;
        self.authorize(actor, &room, "room")?;

        let topic = TopicName::parse(draft.topic)?;
        let current_topic = room.topic_id;
        room.revise(
            current_topic,
            draft.name,
            draft.description,
            self.deps.clock.now(),
        )?;
        room.topic_id = self.resolve_topic(topic).await?;

        let stored = self
            .deps
            .room_repository
            .update(room)
            .await
            .map_err(room_missing)?;
        tracing::info!(room_id = %stored.id, "room updated");
        Ok(stored)
    }

    /// 删除确认页所需的房间信息；仅房主可见。
    pub async fn deletable_room(
        &self,
        actor: UserId,
        room_id: RoomId,
    ) -> Result<RoomRef, ApplicationError> {
        let room = self.load_room(room_id).await?;
        self.authorize(actor, &room, "room")?;
        Ok(RoomRef::from(&room))
    }

    pub async fn delete_room(&self, actor: UserId, room_id: RoomId) -> Result<(), ApplicationError> {
        let room = self.load_room(room_id).await?;
        self.authorize(actor, &room, "room")?;

        self.deps
            .room_repository
            .delete(room.id)
            .await
            .map_err(room_missing)?;
        tracing::info!(room_id = %room.id, host_id = %actor, "room deleted");
        Ok(())
    }

    pub async fn room_detail(&self, room_id: RoomId) -> Result<RoomDetail, ApplicationError> {
        let room = self.load_room(room_id).await?;
        let messages = self.deps.message_repository.list_by_room(room.id).await?;
        let participant_ids = self.deps.room_repository.list_participants(room.id).await?;

        let room = self
            .read_models
            .rooms(vec![room])
            .await?
            .pop()
            .ok_or(ApplicationError::Domain(DomainError::RoomNotFound))?;
        Ok(RoomDetail {
            room,
            messages: self.read_models.messages(messages).await?,
            participants: self.read_models.user_refs(participant_ids).await?,
        })
    }

    /// 发帖并把作者加入参与者集合，两者在一次存储操作内完成。
    pub async fn post_message(
        &self,
        actor: UserId,
        room_id: RoomId,
        body: String,
    ) -> Result<Message, ApplicationError> {
        let room = self.load_room(room_id).await?;
        let message = Message::post(
            MessageId::generate(),
            room.id,
            actor,
            MessageBody::new(body)?,
            self.deps.clock.now(),
        );

        let stored = self
            .deps
            .message_repository
            .create_with_participant(message)
            .await
            .map_err(room_missing)?;
        tracing::info!(message_id = %stored.id, room_id = %room.id, user_id = %actor, "message posted");
        Ok(stored)
    }

    /// 删除确认页所需的消息信息；仅作者可见。
    pub async fn deletable_message(
        &self,
        actor: UserId,
        message_id: MessageId,
    ) -> Result<MessageDto, ApplicationError> {
        let message = self.load_message(message_id).await?;
        self.authorize(actor, &message, "message")?;
        self.read_models
            .messages(vec![message])
            .await?
            .pop()
            .ok_or(ApplicationError::Domain(DomainError::MessageNotFound))
    }

    pub async fn delete_message(
        &self,
        actor: UserId,
        message_id: MessageId,
    ) -> Result<(), ApplicationError> {
        let message = self.load_message(message_id).await?;
        self.authorize(actor, &message, "message")?;

        self.deps
            .message_repository
            .delete(message.id)
            .await
            .map_err(message_missing)?;
        tracing::info!(message_id = %message.id, user_id = %actor, "message deleted");
        Ok(())
    }
}
