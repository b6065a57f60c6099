//! Create `support_chat` table. `assigned_admin_id` is null until an admin picks the chat.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportChat::Table)
                    .if_not_exists()
                    .col(uuid(SupportChat::Id).primary_key())
                    .col(uuid(SupportChat::UserId).not_null())
                    .col(uuid_null(SupportChat::AssignedAdminId))
                    .col(string_len(SupportChat::Subject, 160).not_null())
                    .col(string_len(SupportChat::Status, 16).not_null())
                    .col(timestamp_with_time_zone(SupportChat::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(SupportChat::UpdatedAt).not_null())
                    .col(timestamp_with_time_zone_null(SupportChat::ClosedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_user")
                            .from(SupportChat::Table, SupportChat::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_admin")
                            .from(SupportChat::Table, SupportChat::AssignedAdminId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SupportChat::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SupportChat { Table, Id, UserId, AssignedAdminId, Subject, Status, CreatedAt, UpdatedAt, ClosedAt }

#[derive(DeriveIden)]
enum AppUser { Table, Id }
