//! 测试环境管理
//!
//! 每个环境拥有独立的内存存储，服务之间共享同一份数据。

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use application::{
    Clock, RoomService, RoomServiceDependencies, SearchService, SearchServiceDependencies,
    UserService, UserServiceDependencies,
};
use domain::Timestamp;
use infrastructure::{BcryptPasswordHasher, MemoryStorage};
use time::{macros::datetime, Duration};

/// 每次取时间前进一秒，保证排序断言稳定。
#[derive(Debug, Default)]
pub struct SteppingClock {
    ticks: AtomicI64,
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        datetime!(2024-01-01 00:00 UTC) + Duration::seconds(tick)
    }
}

pub struct TestEnvironment {
    pub storage: MemoryStorage,
    pub user_service: UserService,
    pub room_service: RoomService,
    pub search_service: SearchService,
}

impl TestEnvironment {
    pub fn new() -> Arc<Self> {
        let storage = MemoryStorage::new();
        let clock: Arc<dyn Clock> = Arc::new(SteppingClock::default());

        let user_service = UserService::new(UserServiceDependencies {
            user_repository: storage.user_repository.clone(),
            password_hasher: Arc::new(BcryptPasswordHasher::new(4)),
            clock: clock.clone(),
        });
        let room_service = RoomService::new(RoomServiceDependencies {
            room_repository: storage.room_repository.clone(),
            topic_repository: storage.topic_repository.clone(),
            message_repository: storage.message_repository.clone(),
            user_repository: storage.user_repository.clone(),
            clock,
        });
        let search_service = SearchService::new(SearchServiceDependencies {
            room_repository: storage.room_repository.clone(),
            topic_repository: storage.topic_repository.clone(),
            message_repository: storage.message_repository.clone(),
            user_repository: storage.user_repository.clone(),
        });

        Arc::new(Self {
            storage,
            user_service,
            room_service,
            search_service,
        })
    }
}
