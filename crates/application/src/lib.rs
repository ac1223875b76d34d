//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、所有权校验、
//! 以及对外部适配器（例如密码哈希、持久化存储）的抽象。

pub mod clock;
pub mod dto;
pub mod error;
pub mod password;
pub mod repository;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use dto::{
    HomeView, MessageDto, ProfileView, RoomDetail, RoomDto, RoomRef, TopicDto, TopicRef, UserDto,
    UserRef,
};
pub use error::ApplicationError;
pub use password::{PasswordHasher, PasswordHasherError};
pub use repository::{MessageRepository, RoomRepository, TopicRepository, UserRepository};
pub use services::{
    AuthenticateUserRequest, RegisterUserRequest, RoomDraft, RoomService,
    RoomServiceDependencies, SearchService, SearchServiceDependencies, UpdateProfileRequest,
    UserService, UserServiceDependencies,
};
