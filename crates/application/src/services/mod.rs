mod read_model;
mod room_service;
mod search_service;
mod user_service;

pub use room_service::{RoomDraft, RoomService, RoomServiceDependencies};
pub use search_service::{SearchService, SearchServiceDependencies, HOME_TOPIC_LIMIT};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UpdateProfileRequest, UserService,
    UserServiceDependencies,
};
