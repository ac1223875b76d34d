use std::sync::Arc;

use application::{
    Clock, MessageRepository, PasswordHasher, RoomRepository, RoomService,
    RoomServiceDependencies, SearchService, SearchServiceDependencies, TopicRepository,
    UserRepository, UserService, UserServiceDependencies,
};

use crate::render::{JsonViewRenderer, ViewRenderer};

/// 组装用例服务所需的全部外部端口。
#[derive(Clone)]
pub struct Ports {
    pub user_repository: Arc<dyn UserRepository>,
    pub topic_repository: Arc<dyn TopicRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub search_service: Arc<SearchService>,
    pub renderer: Arc<dyn ViewRenderer>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        room_service: Arc<RoomService>,
        search_service: Arc<SearchService>,
    ) -> Self {
        Self {
            user_service,
            room_service,
            search_service,
            renderer: Arc::new(JsonViewRenderer),
        }
    }

    pub fn from_ports(ports: Ports) -> Self {
        let user_service = UserService::new(UserServiceDependencies {
            user_repository: ports.user_repository.clone(),
            password_hasher: ports.password_hasher,
            clock: ports.clock.clone(),
        });

        let room_service = RoomService::new(RoomServiceDependencies {
            room_repository: ports.room_repository.clone(),
            topic_repository: ports.topic_repository.clone(),
            message_repository: ports.message_repository.clone(),
            user_repository: ports.user_repository.clone(),
            clock: ports.clock,
        });

        let search_service = SearchService::new(SearchServiceDependencies {
            room_repository: ports.room_repository,
            topic_repository: ports.topic_repository,
            message_repository: ports.message_repository,
            user_repository: ports.user_repository,
        });

        Self::new(
            Arc::new(user_service),
            Arc::new(room_service),
            Arc::new(search_service),
        )
    }

    /// 替换默认的 JSON 渲染器，例如接入模板引擎。
    pub fn with_renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}
