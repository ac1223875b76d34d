//! 测试数据工厂

use std::sync::Arc;

use anyhow::Result;
use application::{RegisterUserRequest, RoomDraft};
use domain::{Message, Room, User};

use crate::TestEnvironment;

pub const TEST_PASSWORD: &str = "correct-horse";

pub struct TestDataFactory {
    env: Arc<TestEnvironment>,
}

impl TestDataFactory {
    pub fn new(env: Arc<TestEnvironment>) -> Self {
        Self { env }
    }

    pub async fn create_user(&self, username: &str) -> Result<User> {
        Ok(self
            .env
            .user_service
            .register(RegisterUserRequest {
                username: username.to_owned(),
                password: TEST_PASSWORD.to_owned(),
                password_confirmation: TEST_PASSWORD.to_owned(),
            })
            .await?)
    }

    pub async fn create_room(&self, host: &User, topic: &str, name: &str) -> Result<Room> {
        self.create_room_with_description(host, topic, name, "")
            .await
    }

    pub async fn create_room_with_description(
        &self,
        host: &User,
        topic: &str,
        name: &str,
        description: &str,
    ) -> Result<Room> {
        Ok(self
            .env
            .room_service
            .create_room(
                host.id,
                RoomDraft {
                    topic: topic.to_owned(),
                    name: name.to_owned(),
                    description: description.to_owned(),
                },
            )
            .await?)
    }

    pub async fn post(&self, author: &User, room: &Room, body: &str) -> Result<Message> {
        Ok(self
            .env
            .room_service
            .post_message(author.id, room.id, body.to_owned())
            .await?)
    }
}
