use thiserror::Error;
use uuid::Uuid;

use crate::model::User;
use crate::role::{Permission, Role};

/// Why an actor may not perform an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The role categorically lacks the capability, whatever the resource.
    #[error("role {role:?} lacks the {permission:?} permission")]
    Forbidden { role: Role, permission: Permission },
    /// The actor has no rights over this particular resource.
    #[error("not permitted to act on a {resource} belonging to another user")]
    Unauthorized { resource: &'static str },
}

/// Pure lookup into the role table.
pub fn authorize(role: Role, permission: Permission) -> Result<(), AuthorizationError> {
    if role.allows(permission) {
        Ok(())
    } else {
        Err(AuthorizationError::Forbidden { role, permission })
    }
}

/// Decides the role a new account gets.
///
/// `actor_role` is `Role::Anon` for unauthenticated callers. Anyone who may
/// create users can create a plain User; any other role needs
/// `ModifyAllUsers`.
pub fn authorize_user_creation(
    actor_role: Role,
    requested: Option<Role>,
) -> Result<Role, AuthorizationError> {
    let role = requested.unwrap_or(Role::User);
    if actor_role.allows(Permission::ModifyAllUsers) {
        return Ok(role);
    }
    if !actor_role.allows(Permission::CreateUser)
        && !actor_role.allows(Permission::ModifyAllUsersRestricted)
    {
        return authorize(actor_role, Permission::CreateUser).map(|_| role);
    }
    if role != Role::User {
        return authorize(actor_role, Permission::ModifyAllUsers).map(|_| role);
    }
    Ok(role)
}

/// An authenticated caller: identity plus current role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    id: Uuid,
    role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn authorize(&self, permission: Permission) -> Result<(), AuthorizationError> {
        authorize(self.role, permission)
    }

    /// Owner filter for task reads.
    ///
    /// Without `ViewAllTasks` an absent filter narrows to the actor's own
    /// tasks, while naming someone else is rejected outright.
    pub fn task_view_scope(
        &self,
        requested: Option<Uuid>,
    ) -> Result<Option<Uuid>, AuthorizationError> {
        if self.role.allows(Permission::ViewAllTasks) {
            return Ok(requested);
        }
        match requested {
            None => Ok(Some(self.id)),
            Some(id) if id == self.id => Ok(Some(id)),
            Some(_) => self.authorize(Permission::ViewAllTasks).map(|_| None),
        }
    }

    /// Owner filter for looking up a task before modifying it.
    ///
    /// A task outside the returned scope must surface as not found.
    pub fn task_write_scope(&self) -> Result<Option<Uuid>, AuthorizationError> {
        if self.role.allows(Permission::ModifyAllTasks) {
            return Ok(None);
        }
        self.authorize(Permission::ModifySelfTasks)?;
        Ok(Some(self.id))
    }

    /// Checks a write that names its owner explicitly, before any lookup.
    pub fn authorize_task_owner(&self, owner: Uuid) -> Result<(), AuthorizationError> {
        if owner == self.id {
            return self.authorize(Permission::ModifySelfTasks);
        }
        if self.role.allows(Permission::ModifyAllTasks) {
            Ok(())
        } else {
            Err(AuthorizationError::Unauthorized { resource: "task" })
        }
    }

    /// Reading a profile other than one's own needs `ModifyAllUsersRestricted`.
    pub fn authorize_user_view(&self, is_self: bool) -> Result<(), AuthorizationError> {
        if is_self {
            Ok(())
        } else {
            self.authorize(Permission::ModifyAllUsersRestricted)
        }
    }

    /// Cheap pre-check for writes to a user record, before it is fetched.
    pub fn authorize_user_target(&self, target: Uuid) -> Result<(), AuthorizationError> {
        if target == self.id || self.role.allows(Permission::ModifyAllUsersRestricted) {
            Ok(())
        } else {
            Err(AuthorizationError::Unauthorized { resource: "user" })
        }
    }

    /// Full check for modifying or deleting `target`.
    ///
    /// Changing a role needs `ModifyAllUsers`. Holders of only the
    /// restricted permission cannot touch users above their own role.
    pub fn authorize_user_write(
        &self,
        target: &User,
        new_role: Option<Role>,
    ) -> Result<(), AuthorizationError> {
        if new_role.is_some_and(|role| role != target.role) {
            self.authorize(Permission::ModifyAllUsers)?;
        }
        if target.id == self.id || self.role.allows(Permission::ModifyAllUsers) {
            return Ok(());
        }
        if self.role.allows(Permission::ModifyAllUsersRestricted) && target.role <= self.role {
            return Ok(());
        }
        Err(AuthorizationError::Unauthorized { resource: "user" })
    }
}
