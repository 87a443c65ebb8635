//! User directory

use chrono::{DateTime, Utc};
use shared::{Role, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// User directory service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.parse().map_err(|e| AppError::corrupt("user role", e))?,
            created_at: row.created_at,
        })
    }
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Salespersons that plots can be assigned to
    pub async fn list_salespersons(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, created_at FROM users WHERE role = $1 ORDER BY name",
        )
        .bind(Role::Salesperson.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
