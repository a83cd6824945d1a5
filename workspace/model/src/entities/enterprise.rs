use sea_orm::entity::prelude::*;

/// A tenant owning a pool of primary-card seats and additional-card seats.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "enterprises")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Total primary-card seats.
    pub license_count: i32,
    /// Pooled additional-card seats.
    pub sub_license_count: i32,
    /// Seats handed out to members so far.
    pub licenses_used: i32,
    /// Additional-card seats distributed to members so far.
    pub sub_licenses_used: i32,
    pub logo: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
    #[sea_orm(has_many = "super::license_request::Entity")]
    LicenseRequest,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::license_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LicenseRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
