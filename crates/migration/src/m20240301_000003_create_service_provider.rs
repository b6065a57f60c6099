//! Create `service_provider` table.
//!
//! One profile per user. Moderation audit columns are stamped by admins.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceProvider::Table)
                    .if_not_exists()
                    .col(uuid(ServiceProvider::Id).primary_key())
                    .col(uuid(ServiceProvider::UserId).unique_key().not_null())
                    .col(string_len(ServiceProvider::DisplayName, 128).not_null())
                    .col(text(ServiceProvider::Bio).not_null())
                    .col(string_len(ServiceProvider::Document, 14).not_null())
                    .col(string_len(ServiceProvider::City, 128).not_null())
                    .col(string_len(ServiceProvider::State, 2).not_null())
                    .col(string_len(ServiceProvider::Status, 16).not_null())
                    .col(uuid_null(ServiceProvider::ModeratedBy))
                    .col(timestamp_with_time_zone_null(ServiceProvider::ModeratedAt))
                    .col(text_null(ServiceProvider::ModerationReason))
                    .col(timestamp_with_time_zone(ServiceProvider::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ServiceProvider::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_user")
                            .from(ServiceProvider::Table, ServiceProvider::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_moderator")
                            .from(ServiceProvider::Table, ServiceProvider::ModeratedBy)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceProvider::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceProvider {
    Table, Id, UserId, DisplayName, Bio, Document, City, State, Status,
    ModeratedBy, ModeratedAt, ModerationReason, CreatedAt, UpdatedAt,
}

#[derive(DeriveIden)]
enum AppUser { Table, Id }
