//! Create `payment` table (one row per checkout attempt).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid(Payment::ServiceRequestId).not_null())
                    .col(uuid(Payment::PayerId).not_null())
                    .col(big_integer(Payment::AmountCents).not_null())
                    .col(big_integer(Payment::PlatformFeeCents).not_null())
                    .col(string_len(Payment::Status, 16).not_null())
                    .col(string_len(Payment::Gateway, 32).not_null())
                    .col(string_len_null(Payment::PreferenceId, 128))
                    .col(string_len_null(Payment::ExternalId, 64))
                    .col(text_null(Payment::CheckoutUrl))
                    .col(timestamp_with_time_zone(Payment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Payment::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_request")
                            .from(Payment::Table, Payment::ServiceRequestId)
                            .to(ServiceRequest::Table, ServiceRequest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_payer")
                            .from(Payment::Table, Payment::PayerId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Payment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Payment {
    Table, Id, ServiceRequestId, PayerId, AmountCents, PlatformFeeCents, Status, Gateway,
    PreferenceId, ExternalId, CheckoutUrl, CreatedAt, UpdatedAt,
}

#[derive(DeriveIden)]
enum ServiceRequest { Table, Id }

#[derive(DeriveIden)]
enum AppUser { Table, Id }
