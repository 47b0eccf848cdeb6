use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    password::verify_password_blocking,
    repo_types::{NewUser, Role, User},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    DuplicateKey(String),

    #[error("user not found")]
    NotFound,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Persisted user records. Only the store writes to the underlying table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with `DuplicateKey` when the email is already taken.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Writes the mutable fields of an existing record back.
    async fn save(&self, user: &User) -> Result<(), StoreError>;

    async fn verify_secret(&self, user: &User, candidate: &str) -> Result<bool, StoreError> {
        let ok = verify_password_blocking(candidate.to_owned(), user.password_hash.clone()).await?;
        Ok(ok)
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    role: String,
    mobile_number: String,
    password_hash: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Internal(anyhow::anyhow!(e)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
            mobile_number: row.mobile_number,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, role, mobile_number, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, role, mobile_number, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, email, role, mobile_number, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, role, mobile_number, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(new_user.role.as_str())
        .bind(&new_user.mobile_number)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateKey(new_user.email.clone())
            }
            other => StoreError::Database(other),
        })?;
        User::try_from(row)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, mobile_number = $3, password_hash = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.mobile_number)
        .bind(&user.password_hash)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
