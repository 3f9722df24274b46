use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string_len(Users::Username, 256))
                    .col(string_len(Users::FirstName, 256).default(""))
                    .col(string_len(Users::LastName, 256).default(""))
                    .col(string_len(Users::PhoneNumber, 128))
                    .col(string_len(Users::Email, 100))
                    .col(string_len(Users::Password, 128))
                    .col(string_len_null(Users::Image, 100))
                    .col(text_null(Users::About))
                    .col(boolean(Users::IsActive).default(true))
                    .col(boolean(Users::IsStaff).default(false))
                    .col(boolean(Users::IsSuperuser).default(false))
                    .col(timestamp_with_time_zone_null(Users::LastLogin))
                    .col(timestamp_with_time_zone(Users::Created))
                    .col(timestamp_with_time_zone(Users::Updated))
                    .to_owned(),
            )
            .await?;

        // Unique indexes carry the column name so violations can be traced
        // back to the offending field on every backend.
        for (name, column) in [
            ("uq_users_username", Users::Username),
            ("uq_users_phone_number", Users::PhoneNumber),
            ("uq_users_email", Users::Email),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Users::Table)
                        .col(column)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        for (name, column) in [
            ("idx_users_first_name", Users::FirstName),
            ("idx_users_last_name", Users::LastName),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Users::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Users {
    Table,
    Id,
    Username,
    FirstName,
    LastName,
    PhoneNumber,
    Email,
    Password,
    Image,
    About,
    IsActive,
    IsStaff,
    IsSuperuser,
    LastLogin,
    Created,
    Updated,
}
