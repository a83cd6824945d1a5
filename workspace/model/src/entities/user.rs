use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of a user on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular card owner, individual or enterprise member.
    #[sea_orm(string_value = "staff")]
    Staff,
    /// Enterprise-level administrator (legacy name).
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "enterprise_admin")]
    EnterpriseAdmin,
    /// Platform operator.
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl UserRole {
    /// Roles allowed to act on cards they do not own.
    pub fn is_administrative(self) -> bool {
        matches!(
            self,
            UserRole::Admin | UserRole::EnterpriseAdmin | UserRole::SuperAdmin
        )
    }

    /// Roles allowed to run platform-level actions (provisioning, approvals, suspension).
    pub fn is_platform_admin(self) -> bool {
        self == UserRole::SuperAdmin
    }
}

/// A person holding an account. Owns one primary card and, within
/// `sub_license_count`, additional cards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stored trimmed and lower-cased.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id PHC string.
    pub credential: String,
    /// Display name, kept in sync with the primary card's name.
    pub name: String,
    pub role: UserRole,
    pub plan: String,
    pub enterprise_id: Option<i32>,
    /// Additional cards allowed beyond the primary one.
    pub sub_license_count: i32,
    /// Cards currently owned. Only engine creation paths touch it.
    pub card_count: i32,
    pub is_suspended: bool,
    /// Delegated administrator for this user's cards.
    pub assigned_admin_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enterprise::Entity",
        from = "Column::EnterpriseId",
        to = "super::enterprise::Column::Id"
    )]
    Enterprise,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::AssignedAdminId",
        to = "Column::Id"
    )]
    AssignedAdmin,
    #[sea_orm(has_many = "super::card::Entity")]
    Card,
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::enterprise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enterprise.def()
    }
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
