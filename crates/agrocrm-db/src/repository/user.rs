//! # User Repository
//!
//! User accounts and invites. An invite is a user row in `invited`
//! status; accepting it flips the status to `active`. Authentication
//! itself lives outside this system.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{User, UserStatus};

const USER_COLUMNS: &str = "\
    id, tenant_id, name, email, role, status, created_at, updated_at";

/// Repository for users.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user (typically an invite in `invited` status).
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already used in tenant
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, email = %user.email, role = ?user.role, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, tenant_id, name, email, role, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.tenant_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by email inside a tenant.
    pub async fn get_by_email(&self, tenant_id: &str, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ?1 AND email = ?2");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Lists a tenant's users, admins first then by name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE tenant_id = ?1 ORDER BY role, name"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Moves a user through its lifecycle (invited → active → disabled).
    pub async fn set_status(&self, id: &str, status: UserStatus) -> DbResult<()> {
        debug!(id = %id, status = ?status, "Setting user status");

        let now = Utc::now();

        let result = sqlx::query("UPDATE users SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}

/// Generates a new user ID.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use agrocrm_core::{Role, DEFAULT_TENANT_ID};

    fn user(id: &str, email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: "Ana Souza".to_string(),
            email: email.to_string(),
            role,
            status: UserStatus::Invited,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_invite_then_activate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.insert(&user("u-1", "ana@agro.example", Role::Seller)).await.unwrap();

        let invited = repo.get_by_id("u-1").await.unwrap().unwrap();
        assert_eq!(invited.status, UserStatus::Invited);

        repo.set_status("u-1", UserStatus::Active).await.unwrap();
        let active = repo
            .get_by_email(DEFAULT_TENANT_ID, "ana@agro.example")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.insert(&user("u-1", "ana@agro.example", Role::Seller)).await.unwrap();
        let err = repo
            .insert(&user("u-2", "ana@agro.example", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
