//! # Client & Opportunity Repositories
//!
//! CRUD for clients/leads and the sales-opportunity pipeline. Both are
//! owned by a seller and row-scoped through [`Viewer`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{Client, ClientStatus, Opportunity, OpportunityStage, Viewer};

const CLIENT_COLUMNS: &str = "\
    id, tenant_id, owner_user_id, name, farm_name, email, phone, \
    city, region, status, notes, created_at, updated_at";

/// Repository for clients and leads.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Inserts a client.
    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, tenant_id, owner_user_id, name, farm_name, email, phone,
                city, region, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&client.id)
        .bind(&client.tenant_id)
        .bind(&client.owner_user_id)
        .bind(&client.name)
        .bind(&client.farm_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.city)
        .bind(&client.region)
        .bind(client.status)
        .bind(&client.notes)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a client's mutable fields.
    pub async fn update(&self, client: &Client) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?2, farm_name = ?3, email = ?4, phone = ?5,
                city = ?6, region = ?7, status = ?8, notes = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.farm_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.city)
        .bind(&client.region)
        .bind(client.status)
        .bind(&client.notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", &client.id));
        }

        Ok(())
    }

    /// Moves a lead/client through its lifecycle.
    pub async fn set_status(&self, id: &str, status: ClientStatus) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE clients SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// Lists clients visible to a viewer.
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<Client>> {
        let clients = if viewer.sees_all_rows() {
            let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name LIMIT ?1");
            sqlx::query_as::<_, Client>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {CLIENT_COLUMNS} FROM clients \
                 WHERE owner_user_id = ?1 ORDER BY name LIMIT ?2"
            );
            sqlx::query_as::<_, Client>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(clients)
    }
}

const OPPORTUNITY_COLUMNS: &str = "\
    id, tenant_id, client_id, seller_id, title, stage, \
    expected_value_cents, expected_close_at, notes, created_at, updated_at";

/// Repository for the opportunity pipeline.
#[derive(Debug, Clone)]
pub struct OpportunityRepository {
    pool: SqlitePool,
}

impl OpportunityRepository {
    /// Creates a new OpportunityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OpportunityRepository { pool }
    }

    /// Gets an opportunity by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Opportunity>> {
        let sql = format!("SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = ?1");
        let opportunity = sqlx::query_as::<_, Opportunity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(opportunity)
    }

    /// Inserts an opportunity.
    pub async fn insert(&self, opportunity: &Opportunity) -> DbResult<()> {
        debug!(id = %opportunity.id, title = %opportunity.title, "Inserting opportunity");

        sqlx::query(
            r#"
            INSERT INTO opportunities (
                id, tenant_id, client_id, seller_id, title, stage,
                expected_value_cents, expected_close_at, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&opportunity.id)
        .bind(&opportunity.tenant_id)
        .bind(&opportunity.client_id)
        .bind(&opportunity.seller_id)
        .bind(&opportunity.title)
        .bind(opportunity.stage)
        .bind(opportunity.expected_value_cents)
        .bind(opportunity.expected_close_at)
        .bind(&opportunity.notes)
        .bind(opportunity.created_at)
        .bind(opportunity.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Moves an opportunity to a new stage.
    pub async fn set_stage(&self, id: &str, stage: OpportunityStage) -> DbResult<()> {
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE opportunities SET stage = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(stage)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Opportunity", id));
        }

        Ok(())
    }

    /// Lists opportunities visible to a viewer, open stages first.
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<Opportunity>> {
        let opportunities = if viewer.sees_all_rows() {
            let sql = format!(
                "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
                 ORDER BY created_at DESC LIMIT ?1"
            );
            sqlx::query_as::<_, Opportunity>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
                 WHERE seller_id = ?1 ORDER BY created_at DESC LIMIT ?2"
            );
            sqlx::query_as::<_, Opportunity>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(opportunities)
    }
}

/// Generates a new client ID.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new opportunity ID.
pub fn generate_opportunity_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::testutil::seed_user;
    use agrocrm_core::{Role, DEFAULT_TENANT_ID};

    fn sample_client(id: &str, owner: &str, name: &str) -> Client {
        let now = Utc::now();
        Client {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            owner_user_id: owner.to_string(),
            name: name.to_string(),
            farm_name: Some("Fazenda Boa Vista".to_string()),
            email: Some("contato@boavista.agr.br".to_string()),
            phone: None,
            city: Some("Rio Verde".to_string()),
            region: Some("GO".to_string()),
            status: ClientStatus::Lead,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_client_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-1", "Ana", Role::Seller).await;

        let repo = db.clients();
        repo.insert(&sample_client("c-1", "u-1", "João Pereira")).await.unwrap();

        // Lead converts to active client
        repo.set_status("c-1", ClientStatus::Active).await.unwrap();
        let loaded = repo.get_by_id("c-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, ClientStatus::Active);
    }

    #[tokio::test]
    async fn test_client_list_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-1", "Ana", Role::Seller).await;
        seed_user(&db, "u-2", "Bia", Role::Seller).await;
        seed_user(&db, "u-admin", "Rui", Role::Admin).await;

        let repo = db.clients();
        repo.insert(&sample_client("c-1", "u-1", "João Pereira")).await.unwrap();
        repo.insert(&sample_client("c-2", "u-2", "Marta Gomes")).await.unwrap();

        let admin = Viewer::new("u-admin", Role::Admin);
        assert_eq!(repo.list(&admin, 10).await.unwrap().len(), 2);

        let seller = Viewer::new("u-1", Role::Seller);
        let own = repo.list(&seller, 10).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, "c-1");
    }

    #[tokio::test]
    async fn test_opportunity_stage_moves() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-1", "Ana", Role::Seller).await;
        db.clients()
            .insert(&sample_client("c-1", "u-1", "João Pereira"))
            .await
            .unwrap();

        let now = Utc::now();
        let opp = Opportunity {
            id: "o-1".to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            client_id: "c-1".to_string(),
            seller_id: "u-1".to_string(),
            title: "Soybean season order".to_string(),
            stage: OpportunityStage::New,
            expected_value_cents: 500_000,
            expected_close_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let repo = db.opportunities();
        repo.insert(&opp).await.unwrap();
        repo.set_stage("o-1", OpportunityStage::Won).await.unwrap();

        let loaded = repo.get_by_id("o-1").await.unwrap().unwrap();
        assert_eq!(loaded.stage, OpportunityStage::Won);
        assert!(loaded.stage.is_terminal());
    }
}
