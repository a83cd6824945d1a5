//! Shared fixtures for the engine's unit tests.

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use model::entities::{card, enterprise, user, user::UserRole};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, Set,
};
use tempfile::TempDir;

/// Fresh in-memory database with every migration applied.
pub async fn setup_db() -> DatabaseConnection {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Migrations failed");
    db
}

/// Migrated SQLite database in a temporary file, served by a pool with
/// several connections so tasks really race. Keep the `TempDir` alive for
/// as long as the connection is used.
pub async fn setup_file_db() -> (TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("engine.db").display());

    let mut options = ConnectOptions::new(url);
    options.max_connections(8).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to file database");
    Migrator::up(&db, None).await.expect("Migrations failed");
    (dir, db)
}

/// Unsaved user row for pure decision tests.
pub fn user_fixture(id: i32, role: UserRole, enterprise_id: Option<i32>) -> user::Model {
    user::Model {
        id,
        email: format!("user{id}@example.com"),
        credential: String::new(),
        name: format!("User {id}"),
        role,
        plan: "free".to_string(),
        enterprise_id,
        sub_license_count: 0,
        card_count: 0,
        is_suspended: false,
        assigned_admin_id: None,
        created_at: Utc::now(),
    }
}

pub async fn insert_enterprise(
    db: &DatabaseConnection,
    name: &str,
    license_count: i32,
    sub_license_count: i32,
) -> enterprise::Model {
    enterprise::ActiveModel {
        name: Set(name.to_string()),
        license_count: Set(license_count),
        sub_license_count: Set(sub_license_count),
        licenses_used: Set(0),
        sub_licenses_used: Set(0),
        logo: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert enterprise")
}

/// Inserts a user without cards. `card_count` follows [`insert_card`].
pub async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
    enterprise_id: Option<i32>,
    sub_license_count: i32,
) -> user::Model {
    user::ActiveModel {
        email: Set(email.to_string()),
        credential: Set("$argon2id$placeholder".to_string()),
        name: Set("Test User".to_string()),
        role: Set(role),
        plan: Set("free".to_string()),
        enterprise_id: Set(enterprise_id),
        sub_license_count: Set(sub_license_count),
        card_count: Set(0),
        is_suspended: Set(false),
        assigned_admin_id: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

/// Inserts a card and bumps the owner's `card_count`.
pub async fn insert_card(
    db: &DatabaseConnection,
    user_id: i32,
    slug: &str,
    parent_id: Option<i32>,
    template_id: Option<&str>,
) -> card::Model {
    let now = Utc::now();
    let card = card::ActiveModel {
        user_id: Set(user_id),
        slug: Set(slug.to_string()),
        template_id: Set(template_id.map(str::to_string)),
        parent_id: Set(parent_id),
        is_suspended: Set(false),
        name: Set("Test User".to_string()),
        title: Set(None),
        company: Set(None),
        bio: Set(None),
        phone: Set(None),
        email: Set(None),
        website: Set(None),
        address: Set(None),
        socials: Set(None),
        phones: Set(None),
        emails: Set(None),
        gallery: Set(None),
        design: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert card");

    user::Entity::update_many()
        .col_expr(
            user::Column::CardCount,
            Expr::col(user::Column::CardCount).add(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await
        .expect("Failed to bump card count");

    card
}

pub async fn set_card_suspended(db: &DatabaseConnection, card_id: i32, suspended: bool) {
    card::Entity::update_many()
        .col_expr(card::Column::IsSuspended, Expr::value(suspended))
        .filter(card::Column::Id.eq(card_id))
        .exec(db)
        .await
        .expect("Failed to update card suspension");
}

pub async fn set_user_suspended(db: &DatabaseConnection, user_id: i32, suspended: bool) {
    user::Entity::update_many()
        .col_expr(user::Column::IsSuspended, Expr::value(suspended))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await
        .expect("Failed to update user suspension");
}

pub async fn reload_user(db: &DatabaseConnection, user_id: i32) -> user::Model {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .expect("Failed to load user")
        .expect("User missing")
}

pub async fn reload_enterprise(db: &DatabaseConnection, enterprise_id: i32) -> enterprise::Model {
    enterprise::Entity::find_by_id(enterprise_id)
        .one(db)
        .await
        .expect("Failed to load enterprise")
        .expect("Enterprise missing")
}
