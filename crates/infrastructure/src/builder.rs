use std::sync::Arc;

use application::{
    MessageRepository, PasswordHasher, RoomRepository, TopicRepository, UserRepository,
};
use config::{AppConfig, StorageBackend};
use thiserror::Error;

use crate::{
    memory::MemoryStorage,
    migrations::MIGRATOR,
    password::BcryptPasswordHasher,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Clone)]
pub struct InfrastructureConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub bcrypt_cost: u32,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for InfrastructureConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            backend: config.storage,
            database_url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            bcrypt_cost: config.security.bcrypt_cost,
        }
    }
}

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 按配置选定的存储后端与密码哈希器，以 trait 对象交给应用层。
#[derive(Clone)]
pub struct Infrastructure {
    pub user_repository: Arc<dyn UserRepository>,
    pub topic_repository: Arc<dyn TopicRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
}

impl Infrastructure {
    pub async fn connect(config: InfrastructureConfig) -> Result<Self, InfrastructureError> {
        let password_hasher = Arc::new(BcryptPasswordHasher::new(config.bcrypt_cost));

        match config.backend {
            StorageBackend::Postgres => {
                let pool = create_pg_pool(&config.database_url, config.max_connections).await?;
                MIGRATOR.run(&pool).await?;
                tracing::info!("connected to postgres and applied migrations");
                Ok(Self::from_pg(PgStorage::new(pool), password_hasher))
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(MemoryStorage::new(), password_hasher))
            }
        }
    }

    pub fn from_pg(storage: PgStorage, password_hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            user_repository: storage.user_repository,
            topic_repository: storage.topic_repository,
            room_repository: storage.room_repository,
            message_repository: storage.message_repository,
            password_hasher,
        }
    }

    pub fn in_memory(storage: MemoryStorage, password_hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            user_repository: storage.user_repository,
            topic_repository: storage.topic_repository,
            room_repository: storage.room_repository,
            message_repository: storage.message_repository,
            password_hasher,
        }
    }
}
