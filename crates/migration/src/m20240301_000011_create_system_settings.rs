//! Create `system_settings` singleton table and seed row id = 1.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemSettings::Table)
                    .if_not_exists()
                    .col(integer(SystemSettings::Id).primary_key())
                    .col(integer(SystemSettings::PlatformFeePercent).not_null().default(10))
                    .col(boolean(SystemSettings::MaintenanceMode).not_null().default(false))
                    .col(string_len(SystemSettings::SupportEmail, 255).not_null())
                    .col(uuid_null(SystemSettings::UpdatedBy))
                    .col(timestamp_with_time_zone(SystemSettings::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        let seed = Query::insert()
            .into_table(SystemSettings::Table)
            .columns([
                SystemSettings::Id,
                SystemSettings::PlatformFeePercent,
                SystemSettings::MaintenanceMode,
                SystemSettings::SupportEmail,
                SystemSettings::UpdatedAt,
            ])
            .values_panic([
                1.into(),
                10.into(),
                false.into(),
                "suporte@myserv.com.br".into(),
                Expr::current_timestamp().into(),
            ])
            .on_conflict(OnConflict::column(SystemSettings::Id).do_nothing().to_owned())
            .to_owned();
        manager.exec_stmt(seed).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SystemSettings::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SystemSettings { Table, Id, PlatformFeePercent, MaintenanceMode, SupportEmail, UpdatedBy, UpdatedAt }
