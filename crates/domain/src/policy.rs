//! 授权策略
//!
//! 所有变更操作在执行前统一调用 [`ensure_can_mutate`]：只有资源的所有者
//! （房间的房主、消息的作者、用户本人）可以修改或删除它。

use crate::errors::DomainError;
use crate::message::Message;
use crate::room::Room;
use crate::user::User;
use crate::value_objects::UserId;

/// 拥有唯一所有者的资源。
pub trait Owned {
    fn owner_id(&self) -> UserId;
}

impl Owned for Room {
    fn owner_id(&self) -> UserId {
        self.host_id
    }
}

impl Owned for Message {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

impl Owned for User {
    fn owner_id(&self) -> UserId {
        self.id
    }
}

pub fn can_mutate<R: Owned + ?Sized>(actor: UserId, resource: &R) -> bool {
    resource.owner_id() == actor
}

pub fn ensure_can_mutate<R: Owned + ?Sized>(actor: UserId, resource: &R) -> Result<(), DomainError> {
    if can_mutate(actor, resource) {
        Ok(())
    } else {
        Err(DomainError::OperationNotAllowed)
    }
}
