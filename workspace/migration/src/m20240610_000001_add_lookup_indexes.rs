use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Cards of a user (quota counting, listing)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_cards_user_id")
                    .table(Alias::new("cards"))
                    .col(Alias::new("user_id"))
                    .to_owned(),
            )
            .await?;

        // Members of an enterprise
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_enterprise_id")
                    .table(Alias::new("users"))
                    .col(Alias::new("enterprise_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_user_id")
                    .table(Alias::new("sessions"))
                    .col(Alias::new("user_id"))
                    .to_owned(),
            )
            .await?;

        // Pending requests per enterprise
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_license_requests_enterprise_status")
                    .table(Alias::new("license_requests"))
                    .col(Alias::new("enterprise_id"))
                    .col(Alias::new("status"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table) in [
            ("idx_license_requests_enterprise_status", "license_requests"),
            ("idx_sessions_user_id", "sessions"),
            ("idx_users_enterprise_id", "users"),
            ("idx_cards_user_id", "cards"),
        ] {
            manager
                .drop_index(
                    Index::drop()
                        .name(name)
                        .table(Alias::new(table))
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}
