//! Create `service` table (catalog entries owned by a provider).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(uuid(Service::Id).primary_key())
                    .col(uuid(Service::ProviderId).not_null())
                    .col(string_len(Service::Title, 160).not_null())
                    .col(text(Service::Description).not_null())
                    .col(string_len(Service::Category, 64).not_null())
                    .col(big_integer(Service::PriceCents).not_null())
                    .col(boolean(Service::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone(Service::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Service::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_provider")
                            .from(Service::Table, Service::ProviderId)
                            .to(ServiceProvider::Table, ServiceProvider::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Service::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Service { Table, Id, ProviderId, Title, Description, Category, PriceCents, IsActive, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum ServiceProvider { Table, Id }
