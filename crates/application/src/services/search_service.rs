use std::sync::Arc;

use domain::{DomainError, SearchTerm, UserId};

use crate::{
    dto::{HomeView, MessageDto, ProfileView, TopicDto, UserDto},
    error::ApplicationError,
    repository::{MessageRepository, RoomRepository, TopicRepository, UserRepository},
    services::read_model::ReadModels,
};

/// 首页侧栏展示的话题数量。
pub const HOME_TOPIC_LIMIT: u32 = 5;

pub struct SearchServiceDependencies {
    pub room_repository: Arc<dyn RoomRepository>,
    pub topic_repository: Arc<dyn TopicRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
}

/// 只读查询：首页、话题列表、动态流、个人主页。
pub struct SearchService {
    deps: SearchServiceDependencies,
    read_models: ReadModels,
}

impl SearchService {
    pub fn new(deps: SearchServiceDependencies) -> Self {
        let read_models = ReadModels {
            user_repository: deps.user_repository.clone(),
            topic_repository: deps.topic_repository.clone(),
            room_repository: deps.room_repository.clone(),
        };
        Self { deps, read_models }
    }

    /// 房间按话题名/房间名/描述匹配；消息只按所在房间的话题名匹配。
    pub async fn home(&self, term: SearchTerm) -> Result<HomeView, ApplicationError> {
        let rooms = self.deps.room_repository.search(&term).await?;
        let topics = self
            .deps
            .topic_repository
            .search(&SearchTerm::everything(), Some(HOME_TOPIC_LIMIT))
            .await?;
        let messages = self.deps.message_repository.search_by_topic(&term).await?;
        let total_room_count = self.deps.room_repository.count().await?;

        let rooms = self.read_models.rooms(rooms).await?;
        Ok(HomeView {
            query: term.as_str().to_owned(),
            room_count: rooms.len(),
            rooms,
            topics: self.read_models.topics(topics).await?,
            total_room_count,
            messages: self.read_models.messages(messages).await?,
        })
    }

    pub async fn topics(&self, term: SearchTerm) -> Result<Vec<TopicDto>, ApplicationError> {
        let topics = self.deps.topic_repository.search(&term, None).await?;
        self.read_models.topics(topics).await
    }

    pub async fn all_topics(&self) -> Result<Vec<TopicDto>, ApplicationError> {
        self.topics(SearchTerm::everything()).await
    }

    pub async fn total_room_count(&self) -> Result<u64, ApplicationError> {
        Ok(self.deps.room_repository.count().await?)
    }

    /// 全部消息，从新到旧，不分页。
    pub async fn activity(&self) -> Result<Vec<MessageDto>, ApplicationError> {
        let messages = self.deps.message_repository.list_all().await?;
        self.read_models.messages(messages).await
    }

    pub async fn profile(&self, user_id: UserId) -> Result<ProfileView, ApplicationError> {
        let user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::UserNotFound))?;
        let rooms = self.deps.room_repository.list_by_host(user.id).await?;
        let messages = self.deps.message_repository.list_by_author(user.id).await?;

        Ok(ProfileView {
            user: UserDto::from(&user),
            rooms: self.read_models.rooms(rooms).await?,
            messages: self.read_models.messages(messages).await?,
            topics: self.all_topics().await?,
            total_room_count: self.total_room_count().await?,
        })
    }
}
