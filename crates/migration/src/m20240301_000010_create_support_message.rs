use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportMessage::Table)
                    .if_not_exists()
                    .col(uuid(SupportMessage::Id).primary_key())
                    .col(uuid(SupportMessage::ChatId).not_null())
                    .col(uuid(SupportMessage::SenderId).not_null())
                    .col(boolean(SupportMessage::FromAdmin).not_null())
                    .col(text(SupportMessage::Body).not_null())
                    .col(timestamp_with_time_zone_null(SupportMessage::ReadAt))
                    .col(timestamp_with_time_zone(SupportMessage::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_chat")
                            .from(SupportMessage::Table, SupportMessage::ChatId)
                            .to(SupportChat::Table, SupportChat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_sender")
                            .from(SupportMessage::Table, SupportMessage::SenderId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SupportMessage::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SupportMessage { Table, Id, ChatId, SenderId, FromAdmin, Body, ReadAt, CreatedAt }

#[derive(DeriveIden)]
enum SupportChat { Table, Id }

#[derive(DeriveIden)]
enum AppUser { Table, Id }
