use sea_orm::entity::prelude::*;

/// A public profile page addressed by its slug.
///
/// A card without `parent_id` is the owner's primary card; cards pointing at
/// another card of the same user are additional cards and count against the
/// owner's `sub_license_count`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    /// Unique, stored trimmed and lower-cased.
    #[sea_orm(unique)]
    pub slug: String,
    pub template_id: Option<String>,
    pub parent_id: Option<i32>,
    pub is_suspended: bool,
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub socials: Option<Json>,
    pub phones: Option<Json>,
    pub emails: Option<Json>,
    pub gallery: Option<Json>,
    pub design: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn is_primary(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
