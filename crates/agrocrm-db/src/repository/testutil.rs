//! Shared seeding helpers for repository tests.
//!
//! Each helper writes the minimum viable row so foreign keys hold; tests
//! override what they care about through the repositories themselves.

use chrono::Utc;

use crate::pool::Database;
use agrocrm_core::{
    Client, ClientStatus, Role, Sale, SaleStatus, User, UserStatus, DEFAULT_TENANT_ID,
};

pub async fn seed_user(db: &Database, id: &str, name: &str, role: Role) {
    let now = Utc::now();
    db.users()
        .insert(&User {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: name.to_string(),
            email: format!("{}@agro.example", id),
            role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed user");
}

pub async fn seed_client(db: &Database, id: &str, owner_user_id: &str, name: &str) {
    let now = Utc::now();
    db.clients()
        .insert(&Client {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            owner_user_id: owner_user_id.to_string(),
            name: name.to_string(),
            farm_name: None,
            email: None,
            phone: None,
            city: None,
            region: None,
            status: ClientStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed client");
}

pub async fn seed_sale(
    db: &Database,
    id: &str,
    seller_id: &str,
    client_id: &str,
    gross_cents: i64,
    profit_cents: i64,
) {
    let now = Utc::now();
    db.sales()
        .insert_with_items(
            &Sale {
                id: id.to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                client_id: client_id.to_string(),
                seller_id: seller_id.to_string(),
                service_id: None,
                status: SaleStatus::Closed,
                gross_value_cents: gross_cents,
                total_cost_cents: gross_cents - profit_cents,
                estimated_profit_cents: profit_cents,
                payment_received: false,
                sold_at: now,
                created_at: now,
                updated_at: now,
            },
            &[],
        )
        .await
        .expect("seed sale");
}
