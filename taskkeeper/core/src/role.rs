#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Privilege tier of a user, ordered from least to most privileged.
///
/// Persisted and transmitted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "i32", try_from = "i32")
)]
#[repr(i32)]
pub enum Role {
    Anon = 0,
    User = 1,
    Manager = 2,
    Admin = 3,
}

/// A capability that a role either holds or does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    CreateUser,
    ModifySelfTasks,
    ModifyAllUsersRestricted,
    ModifyAllUsers,
    ViewAllTasks,
    ModifyAllTasks,
}

impl Role {
    /// Every role, in privilege order.
    pub const ALL: [Role; 4] = [Role::Anon, Role::User, Role::Manager, Role::Admin];

    /// The fixed permission set granted to this role.
    pub const fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Anon => &[CreateUser],
            Role::User => &[ModifySelfTasks],
            Role::Manager => &[ModifySelfTasks, ModifyAllUsersRestricted, ViewAllTasks],
            Role::Admin => &[
                ModifySelfTasks,
                ModifyAllUsersRestricted,
                ModifyAllUsers,
                ViewAllTasks,
                ModifyAllTasks,
            ],
        }
    }

    /// Returns true if this role holds `permission`.
    pub fn allows(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Returns the integer code of the role.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Looks `permission` up in the role table.
pub fn role_has_permission(role: Role, permission: Permission) -> bool {
    role.allows(permission)
}

impl From<Role> for i32 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

impl TryFrom<i32> for Role {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Role::ALL
            .into_iter()
            .find(|role| role.code() == code)
            .ok_or(ValidationError::new("role", "integer between 0 and 3"))
    }
}
