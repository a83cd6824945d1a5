use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create enterprises table
        manager
            .create_table(
                Table::create()
                    .table(Enterprises::Table)
                    .if_not_exists()
                    .col(pk_auto(Enterprises::Id))
                    .col(string(Enterprises::Name))
                    .col(integer(Enterprises::LicenseCount).default(0))
                    .col(integer(Enterprises::SubLicenseCount).default(0))
                    .col(integer(Enterprises::LicensesUsed).default(0))
                    .col(integer(Enterprises::SubLicensesUsed).default(0))
                    .col(string_null(Enterprises::Logo))
                    .col(timestamp_with_time_zone(Enterprises::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::Credential))
                    .col(string(Users::Name))
                    .col(string_len(Users::Role, 32).default("staff"))
                    .col(string(Users::Plan).default("free"))
                    .col(integer_null(Users::EnterpriseId))
                    .col(integer(Users::SubLicenseCount).default(0))
                    .col(integer(Users::CardCount).default(0))
                    .col(boolean(Users::IsSuspended).default(false))
                    .col(integer_null(Users::AssignedAdminId))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_enterprise")
                            .from(Users::Table, Users::EnterpriseId)
                            .to(Enterprises::Table, Enterprises::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_assigned_admin")
                            .from(Users::Table, Users::AssignedAdminId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create cards table
        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(pk_auto(Cards::Id))
                    .col(integer(Cards::UserId))
                    .col(string(Cards::Slug).unique_key())
                    .col(string_null(Cards::TemplateId))
                    .col(integer_null(Cards::ParentId))
                    .col(boolean(Cards::IsSuspended).default(false))
                    .col(string(Cards::Name))
                    .col(string_null(Cards::Title))
                    .col(string_null(Cards::Company))
                    .col(text_null(Cards::Bio))
                    .col(string_null(Cards::Phone))
                    .col(string_null(Cards::Email))
                    .col(string_null(Cards::Website))
                    .col(string_null(Cards::Address))
                    .col(json_null(Cards::Socials))
                    .col(json_null(Cards::Phones))
                    .col(json_null(Cards::Emails))
                    .col(json_null(Cards::Gallery))
                    .col(json_null(Cards::Design))
                    .col(timestamp_with_time_zone(Cards::CreatedAt))
                    .col(timestamp_with_time_zone(Cards::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_user")
                            .from(Cards::Table, Cards::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_parent")
                            .from(Cards::Table, Cards::ParentId)
                            .to(Cards::Table, Cards::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create sessions table
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(string(Sessions::Id).primary_key())
                    .col(integer(Sessions::UserId))
                    .col(timestamp_with_time_zone(Sessions::ExpiresAt))
                    .col(timestamp_with_time_zone(Sessions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_user")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create license_requests table
        manager
            .create_table(
                Table::create()
                    .table(LicenseRequests::Table)
                    .if_not_exists()
                    .col(pk_auto(LicenseRequests::Id))
                    .col(integer(LicenseRequests::EnterpriseId))
                    .col(integer(LicenseRequests::UserId))
                    .col(string_len(LicenseRequests::RequestType, 16))
                    .col(integer(LicenseRequests::Amount))
                    .col(string_len(LicenseRequests::Status, 16).default("pending"))
                    .col(timestamp_with_time_zone(LicenseRequests::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_license_request_enterprise")
                            .from(LicenseRequests::Table, LicenseRequests::EnterpriseId)
                            .to(Enterprises::Table, Enterprises::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_license_request_user")
                            .from(LicenseRequests::Table, LicenseRequests::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LicenseRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Enterprises::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Enterprises {
    Table,
    Id,
    Name,
    LicenseCount,
    SubLicenseCount,
    LicensesUsed,
    SubLicensesUsed,
    Logo,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Credential,
    Name,
    Role,
    Plan,
    EnterpriseId,
    SubLicenseCount,
    CardCount,
    IsSuspended,
    AssignedAdminId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Cards {
    Table,
    Id,
    UserId,
    Slug,
    TemplateId,
    ParentId,
    IsSuspended,
    Name,
    Title,
    Company,
    Bio,
    Phone,
    Email,
    Website,
    Address,
    Socials,
    Phones,
    Emails,
    Gallery,
    Design,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LicenseRequests {
    Table,
    Id,
    EnterpriseId,
    UserId,
    RequestType,
    Amount,
    Status,
    CreatedAt,
}
