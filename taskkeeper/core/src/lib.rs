//! Domain model and access policy for taskkeeper.
//!
//! Nothing in this crate performs I/O. The server crate combines these
//! pieces with a database connection and an authenticated request.

pub mod authorize;
pub mod model;
pub mod query;
pub mod role;
pub mod validate;

pub use authorize::{Actor, AuthorizationError, authorize, authorize_user_creation};
pub use model::{NewTask, NewUser, Task, TaskPatch, TimeRange, User, UserPatch};
pub use query::{TaskQuery, build_task_query};
pub use role::{Permission, Role, role_has_permission};
pub use validate::ValidationError;
