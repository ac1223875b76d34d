use std::collections::HashMap;
use std::sync::Arc;

use application::repository::{
    MessageRepository, RoomRepository, TopicRepository, UserRepository,
};
use async_trait::async_trait;
use domain::{
    Message, MessageBody, MessageId, PasswordHash, RepositoryError, Room, RoomId, SearchTerm,
    Topic, TopicId, TopicName, User, UserEmail, UserId, Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

/// 构造 ILIKE 子串模式，`%`、`_`、`\` 按字面匹配。空查询词得到 `%%`，匹配全部。
pub(crate) fn like_pattern(term: &SearchTerm) -> String {
    let mut pattern = String::with_capacity(term.as_str().len() + 2);
    pattern.push('%');
    for c in term.as_str().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn count_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: Option<String>,
    password_hash: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username =
            Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let email =
            UserEmail::parse_optional(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            username,
            email,
            password,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TopicRecord {
    id: Uuid,
    name: String,
    created_at: OffsetDateTime,
}

impl TryFrom<TopicRecord> for Topic {
    type Error = RepositoryError;

    fn try_from(value: TopicRecord) -> Result<Self, Self::Error> {
        let name = TopicName::parse(value.name).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Topic::new(TopicId::from(value.id), name, value.created_at))
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    host_id: Uuid,
    topic_id: Uuid,
    name: String,
    description: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RoomRecord> for Room {
    fn from(value: RoomRecord) -> Self {
        Room {
            id: RoomId::from(value.id),
            host_id: UserId::from(value.host_id),
            topic_id: TopicId::from(value.topic_id),
            name: value.name,
            description: value.description,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    room_id: Uuid,
    user_id: Uuid,
    body: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let body = MessageBody::new(value.body).map_err(|err| invalid_data(err.to_string()))?;
        let mut message = Message::post(
            MessageId::from(value.id),
            RoomId::from(value.room_id),
            UserId::from(value.user_id),
            body,
            value.created_at,
        );
        message.updated_at = value.updated_at;
        Ok(message)
    }
}

fn collect<R, T>(records: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    records.into_iter().map(T::try_from).collect()
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";
const ROOM_COLUMNS: &str = "r.id, r.host_id, r.topic_id, r.name, r.description, r.created_at, r.updated_at";
const MESSAGE_COLUMNS: &str = "m.id, m.room_id, m.user_id, m.body, m.created_at, m.updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_ref().map(|email| email.as_str()))
        .bind(user.password.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_ref().map(|email| email.as_str()))
        .bind(user.password.as_str())
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        collect(records)
    }
}

#[derive(Clone)]
pub struct PgTopicRepository {
    pool: PgPool,
}

impl PgTopicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicRepository for PgTopicRepository {
    async fn get_or_create(&self, candidate: Topic) -> Result<Topic, RepositoryError> {
        // 冲突时的空更新让 RETURNING 也能带回已有行
        let record = sqlx::query_as::<_, TopicRecord>(
            r#"
            INSERT INTO topics (id, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, created_at
            "#,
        )
        .bind(Uuid::from(candidate.id))
        .bind(candidate.name.as_str())
        .bind(candidate.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Topic::try_from(record)
    }

    async fn search(
        &self,
        term: &SearchTerm,
        limit: Option<u32>,
    ) -> Result<Vec<Topic>, RepositoryError> {
        let records = sqlx::query_as::<_, TopicRecord>(
            r#"
            SELECT id, name, created_at
            FROM topics
            WHERE name ILIKE $1 ESCAPE '\'
            ORDER BY created_at, name
            LIMIT $2
            "#,
        )
        .bind(like_pattern(term))
        .bind(limit.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        collect(records)
    }

    async fn find_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Topic>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, TopicRecord>(
            "SELECT id, name, created_at FROM topics WHERE id = ANY($1)",
        )
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        collect(records)
    }
}

#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            INSERT INTO rooms AS r (id, host_id, topic_id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING r.id, r.host_id, r.topic_id, r.name, r.description, r.created_at, r.updated_at
            "#,
        )
        .bind(Uuid::from(room.id))
        .bind(Uuid::from(room.host_id))
        .bind(Uuid::from(room.topic_id))
        .bind(room.name)
        .bind(room.description)
        .bind(room.created_at)
        .bind(room.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Room::from(record))
    }

    async fn update(&self, room: Room) -> Result<Room, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            UPDATE rooms AS r
            SET topic_id = $2, name = $3, description = $4, updated_at = $5
            WHERE r.id = $1
            RETURNING r.id, r.host_id, r.topic_id, r.name, r.description, r.created_at, r.updated_at
            "#,
        )
        .bind(Uuid::from(room.id))
        .bind(Uuid::from(room.topic_id))
        .bind(room.name)
        .bind(room.description)
        .bind(room.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Room::from(record))
    }

    async fn delete(&self, id: RoomId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Room::from))
    }

    async fn find_by_ids(&self, ids: &[RoomId]) -> Result<Vec<Room>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, RoomRecord>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = ANY($1)"
        ))
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Room::from).collect())
    }

    async fn search(&self, term: &SearchTerm) -> Result<Vec<Room>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms r
            JOIN topics t ON t.id = r.topic_id
            WHERE t.name ILIKE $1 ESCAPE '\'
               OR r.name ILIKE $1 ESCAPE '\'
               OR r.description ILIKE $1 ESCAPE '\'
            ORDER BY r.updated_at DESC, r.created_at DESC
            "#
        ))
        .bind(like_pattern(term))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Room::from).collect())
    }

    async fn list_by_host(&self, host_id: UserId) -> Result<Vec<Room>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms r
            WHERE r.host_id = $1
            ORDER BY r.updated_at DESC, r.created_at DESC
            "#
        ))
        .bind(Uuid::from(host_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Room::from).collect())
    }

    async fn list_participants(&self, id: RoomId) -> Result<Vec<UserId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM room_participants WHERE room_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(Uuid::from(id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ids.into_iter().map(UserId::from).collect())
    }

    async fn participant_counts(
        &self,
        ids: &[RoomId],
    ) -> Result<HashMap<RoomId, u64>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT room_id, COUNT(*)
            FROM room_participants
            WHERE room_id = ANY($1)
            GROUP BY room_id
            "#,
        )
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (RoomId::from(id), count_to_u64(count)))
            .collect())
    }

    async fn room_counts_by_topic(
        &self,
        ids: &[TopicId],
    ) -> Result<HashMap<TopicId, u64>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT topic_id, COUNT(*)
            FROM rooms
            WHERE topic_id = ANY($1)
            GROUP BY topic_id
            "#,
        )
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (TopicId::from(id), count_to_u64(count)))
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count_to_u64(count))
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        filter: &str,
        order: &str,
        bind: Option<Uuid>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m {filter} ORDER BY m.created_at {order}, m.id {order}"
        );
        let mut query = sqlx::query_as::<_, MessageRecord>(&sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let records = query.fetch_all(&self.pool).await.map_err(map_sqlx_err)?;
        collect(records)
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create_with_participant(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages AS m (id, room_id, user_id, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING m.id, m.room_id, m.user_id, m.body, m.created_at, m.updated_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.user_id))
        .bind(message.body.as_str())
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO room_participants (room_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.user_id))
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Message::try_from(record)
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        self.list_where("WHERE m.room_id = $1", "ASC", Some(Uuid::from(room_id)))
            .await
    }

    async fn list_by_author(&self, user_id: UserId) -> Result<Vec<Message>, RepositoryError> {
        self.list_where("WHERE m.user_id = $1", "DESC", Some(Uuid::from(user_id)))
            .await
    }

    async fn search_by_topic(&self, term: &SearchTerm) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            JOIN rooms r ON r.id = m.room_id
            JOIN topics t ON t.id = r.topic_id
            WHERE t.name ILIKE $1 ESCAPE '\'
            ORDER BY m.created_at DESC, m.id DESC
            "#
        ))
        .bind(like_pattern(term))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        collect(records)
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        self.list_where("", "DESC", None).await
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub topic_repository: Arc<PgTopicRepository>,
    pub room_repository: Arc<PgRoomRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            topic_repository: Arc::new(PgTopicRepository::new(pool.clone())),
            room_repository: Arc::new(PgRoomRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
