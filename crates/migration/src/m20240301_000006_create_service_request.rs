//! Create `service_request` table (bookings).
//!
//! Prices are snapshotted at booking time so later catalog edits do not move them.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceRequest::Table)
                    .if_not_exists()
                    .col(uuid(ServiceRequest::Id).primary_key())
                    .col(uuid(ServiceRequest::ClientId).not_null())
                    .col(uuid(ServiceRequest::ProviderId).not_null())
                    .col(uuid(ServiceRequest::ServiceId).not_null())
                    .col(string_len(ServiceRequest::Status, 16).not_null())
                    .col(timestamp_with_time_zone(ServiceRequest::ScheduledFor).not_null())
                    .col(string_len(ServiceRequest::Address, 255).not_null())
                    .col(text_null(ServiceRequest::Notes))
                    .col(big_integer(ServiceRequest::SubtotalCents).not_null())
                    .col(big_integer(ServiceRequest::DiscountCents).not_null().default(0))
                    .col(big_integer(ServiceRequest::TotalCents).not_null())
                    .col(uuid_null(ServiceRequest::CouponId))
                    .col(timestamp_with_time_zone_null(ServiceRequest::PaidAt))
                    .col(timestamp_with_time_zone(ServiceRequest::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ServiceRequest::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_client")
                            .from(ServiceRequest::Table, ServiceRequest::ClientId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_provider")
                            .from(ServiceRequest::Table, ServiceRequest::ProviderId)
                            .to(ServiceProvider::Table, ServiceProvider::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_service")
                            .from(ServiceRequest::Table, ServiceRequest::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_coupon")
                            .from(ServiceRequest::Table, ServiceRequest::CouponId)
                            .to(Coupon::Table, Coupon::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceRequest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceRequest {
    Table, Id, ClientId, ProviderId, ServiceId, Status, ScheduledFor, Address, Notes,
    SubtotalCents, DiscountCents, TotalCents, CouponId, PaidAt, CreatedAt, UpdatedAt,
}

#[derive(DeriveIden)]
enum AppUser { Table, Id }

#[derive(DeriveIden)]
enum ServiceProvider { Table, Id }

#[derive(DeriveIden)]
enum Service { Table, Id }

#[derive(DeriveIden)]
enum Coupon { Table, Id }
