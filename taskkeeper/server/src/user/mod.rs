use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sea_orm::*;
use std::sync::Arc;
use taskkeeper_core::{NewUser, Role, TimeRange, User, UserPatch};
use uuid::Uuid;

use crate::entities::user;
use crate::store::{StoreError, ensure_live};

pub mod api;

/// State shared by the user handlers.
#[derive(Clone)]
pub struct UserState {
    pub db: Arc<DatabaseConnection>,
}

/// Username of the account created by [`UserStore::admin_exists_or_create`].
pub const ADMIN_USERNAME: &str = "boss";
const ADMIN_EMAIL: &str = "boss@localhost";

impl TryFrom<user::Model> for User {
    type Error = StoreError;

    fn try_from(model: user::Model) -> Result<Self, Self::Error> {
        let role = Role::try_from(model.role).map_err(|_| {
            StoreError::Internal(format!(
                "user {} has unknown role code {}",
                model.id, model.role
            ))
        })?;
        let preferred_hours = match (model.preferred_start, model.preferred_finish) {
            (None, None) => None,
            (start, finish) => Some(TimeRange { start, finish }),
        };
        Ok(User {
            id: model.id,
            username: model.username,
            email: model.email,
            role,
            preferred_hours,
        })
    }
}

/// Data access for the `users` table. Only secure projections leave it.
pub struct UserStore<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserStore<'a> {
    /// Checks the connection is alive and returns a store bound to it.
    pub async fn open(db: &'a DatabaseConnection) -> Result<UserStore<'a>, StoreError> {
        ensure_live(db).await?;
        Ok(UserStore { db })
    }

    /// Creates a user with a fresh id.
    ///
    /// Validates the document first. A taken username or email is a
    /// `Conflict`. The role defaults to `Role::User`.
    #[tracing::instrument(skip(self))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        new_user.validate()?;
        let username = new_user.username.unwrap_or_default();
        let email = new_user.email.unwrap_or_default();

        Self::ensure_unique_in(self.db, None, Some(&username), Some(&email))
            .await?;

        let password = hash_password(new_user.password.unwrap_or_default()).await?;
        let hours = new_user.preferred_hours.unwrap_or_default();
        let active_model = user::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            username: ActiveValue::Set(username),
            email: ActiveValue::Set(email),
            password: ActiveValue::Set(password),
            role: ActiveValue::Set(new_user.role.unwrap_or(Role::User).code()),
            preferred_start: ActiveValue::Set(hours.start),
            preferred_finish: ActiveValue::Set(hours.finish),
        };
        let created = active_model.insert(self.db).await?;
        tracing::info!("Created user {}", created.id);
        User::try_from(created)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        user::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(StoreError::NotFound("user"))
            .and_then(User::try_from)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.find_model_by_username(username)
            .await?
            .ok_or(StoreError::NotFound("user"))
            .and_then(User::try_from)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await?
            .ok_or(StoreError::NotFound("user"))
            .and_then(User::try_from)
    }

    /// Looks a user up by credentials.
    ///
    /// An unknown username and a wrong password both surface as `NotFound`.
    #[tracing::instrument(skip(self, password))]
    pub async fn get_user_by_creds(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        let model = self
            .find_model_by_username(username)
            .await?
            .ok_or(StoreError::NotFound("user"))?;
        if !verify_password(password.to_string(), model.password.clone()).await? {
            tracing::info!("Rejected credentials for {}", username);
            return Err(StoreError::NotFound("user"));
        }
        User::try_from(model)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(self.db)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Merge-updates the present fields of `patch` and returns the result.
    ///
    /// Runs in one transaction: a collision with another user's username or
    /// email leaves the record untouched.
    #[tracing::instrument(skip(self))]
    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, StoreError> {
        patch.validate()?;
        let password = match patch.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let txn = self.db.begin().await?;
        let current = user::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound("user"))?;

        let username = patch.username.filter(|name| *name != current.username);
        let email = patch.email.filter(|email| *email != current.email);
        Self::ensure_unique_in(&txn, Some(id), username.as_deref(), email.as_deref())
            .await?;

        let mut active_model = user::ActiveModel {
            id: ActiveValue::Unchanged(id),
            ..Default::default()
        };
        if let Some(username) = username {
            active_model.username = ActiveValue::Set(username);
        }
        if let Some(email) = email {
            active_model.email = ActiveValue::Set(email);
        }
        if let Some(password) = password {
            active_model.password = ActiveValue::Set(password);
        }
        if let Some(role) = patch.role {
            active_model.role = ActiveValue::Set(role.code());
        }
        if let Some(hours) = patch.preferred_hours {
            active_model.preferred_start = ActiveValue::Set(hours.start);
            active_model.preferred_finish = ActiveValue::Set(hours.finish);
        }

        let updated = if active_model.is_changed() {
            active_model
                .update(&txn)
                .await
                .map_err(StoreError::missing_as("user"))?
        } else {
            current
        };
        txn.commit().await?;
        User::try_from(updated)
    }

    /// Removes a user and returns the deleted record. Tasks are left alone.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<User, StoreError> {
        let deleted = self.get_user_by_id(id).await?;
        let result = user::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound("user"));
        }
        tracing::info!("Deleted user {}", id);
        Ok(deleted)
    }

    /// Creates the admin account with `secret` as its password unless it
    /// already exists. Returns whether an account was created.
    #[tracing::instrument(skip(self, secret))]
    pub async fn admin_exists_or_create(&self, secret: &str) -> Result<bool, StoreError> {
        if self.find_model_by_username(ADMIN_USERNAME).await?.is_some() {
            return Ok(false);
        }
        let admin = NewUser {
            username: Some(ADMIN_USERNAME.to_string()),
            email: Some(ADMIN_EMAIL.to_string()),
            password: Some(secret.to_string()),
            role: Some(Role::Admin),
            preferred_hours: None,
        };
        match self.create_user(admin).await {
            Ok(user) => {
                tracing::info!("Created admin account {}", user.id);
                Ok(true)
            }
            // Lost a race against another bootstrapping instance.
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn find_model_by_username(
        &self,
        username: &str,
    ) -> Result<Option<user::Model>, StoreError> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db)
            .await?)
    }

    async fn ensure_unique_in<C: ConnectionTrait>(
        conn: &C,
        except: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), StoreError> {
        let checks = [
            ("username", user::Column::Username, username),
            ("email", user::Column::Email, email),
        ];
        for (field, column, value) in checks {
            let Some(value) = value else { continue };
            let mut query = user::Entity::find().filter(column.eq(value));
            if let Some(id) = except {
                query = query.filter(user::Column::Id.ne(id));
            }
            if query.one(conn).await?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "user with {field} as {value} already exists"
                )));
            }
        }
        Ok(())
    }
}

async fn hash_password(password: String) -> Result<String, StoreError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|err| StoreError::Internal(err.to_string()))?
    .map_err(|err| StoreError::Internal(format!("Password hashing failed: {err}")))
}

async fn verify_password(password: String, stored: String) -> Result<bool, StoreError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(err),
        }
    })
    .await
    .map_err(|err| StoreError::Internal(err.to_string()))?
    .map_err(|err| StoreError::Internal(format!("Password verification failed: {err}")))
}
