use std::sync::Arc;

use domain::{
    ensure_can_mutate, DomainError, PasswordHash, RepositoryError, User, UserEmail, UserId,
    Username,
};
use tokio::sync::OnceCell;

use crate::{
    clock::Clock, error::ApplicationError, password::PasswordHasher, repository::UserRepository,
};

const PASSWORD_MIN_LEN: usize = 8;

/// 用户不存在时参与校验的占位口令，保证每次登录恰好一次校验调用。
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub email: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
    decoy_hash: OnceCell<PasswordHash>,
}

fn check_password_policy(request: &RegisterUserRequest) -> Result<(), DomainError> {
    if request.password != request.password_confirmation {
        return Err(DomainError::invalid_argument(
            "password_confirmation",
            "the two password fields didn't match",
        ));
    }
    if request.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(DomainError::invalid_argument(
            "password",
            "must contain at least 8 characters",
        ));
    }
    if request.password.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::invalid_argument(
            "password",
            "cannot be entirely numeric",
        ));
    }
    Ok(())
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self {
            deps,
            decoy_hash: OnceCell::new(),
        }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username.clone())?.to_lowercase();
        check_password_policy(&request)?;

        if self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some()
        {
            return Err(ApplicationError::Domain(DomainError::UserAlreadyExists));
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let user = User::register(
            UserId::generate(),
            username,
            password_hash,
            self.deps.clock.now(),
        );

        let stored = self
            .deps
            .user_repository
            .create(user)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => ApplicationError::Domain(DomainError::UserAlreadyExists),
                other => ApplicationError::Repository(other),
            })?;
        tracing::info!(user_id = %stored.id, username = %stored.username, "user registered");
        Ok(stored)
    }

    /// 校验凭证。失败时统一返回 `Authentication`，不区分用户名或密码错误。
    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let user = match Username::parse(request.username) {
            Ok(username) => self.deps.user_repository.find_by_username(&username).await?,
            Err(_) => None,
        };

        let password_ok = match &user {
            Some(user) => {
                self.deps
                    .password_hasher
                    .verify(&request.password, &user.password)
                    .await?
            }
            None => {
                let decoy = self.decoy_hash().await?;
                self.deps
                    .password_hasher
                    .verify(&request.password, decoy)
                    .await?;
                false
            }
        };

        match user {
            Some(user) if password_ok => Ok(user),
            _ => {
                tracing::warn!("rejected login attempt");
                Err(ApplicationError::Authentication)
            }
        }
    }

    pub async fn find_user(&self, id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::UserNotFound))
    }

    /// 只能修改自己的资料；用户名变更时重新检查是否被占用。
    pub async fn update_profile(
        &self,
        actor: UserId,
        request: UpdateProfileRequest,
    ) -> Result<User, ApplicationError> {
        let mut user = self.find_user(actor).await?;
        ensure_can_mutate(actor, &user)?;
        let username = Username::parse(request.username)?;
        let email = UserEmail::parse_optional(request.email)?;

        if username != user.username {
            if let Some(existing) = self
                .deps
                .user_repository
                .find_by_username(&username)
                .await?
            {
                if existing.id != user.id {
                    return Err(ApplicationError::Domain(DomainError::UserAlreadyExists));
                }
            }
        }

        user.update_profile(username, email, self.deps.clock.now());
        let stored = self
            .deps
            .user_repository
            .update(user)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => ApplicationError::Domain(DomainError::UserAlreadyExists),
                other => ApplicationError::Repository(other),
            })?;
        tracing::info!(user_id = %stored.id, "profile updated");
        Ok(stored)
    }

    async fn decoy_hash(&self) -> Result<&PasswordHash, ApplicationError> {
        self.decoy_hash
            .get_or_try_init(|| async { self.deps.password_hasher.hash(DECOY_PASSWORD).await })
            .await
            .map_err(ApplicationError::from)
    }
}
