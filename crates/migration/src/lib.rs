//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_user;
mod m20240301_000002_create_user_credentials;
mod m20240301_000003_create_service_provider;
mod m20240301_000004_create_service;
mod m20240301_000005_create_coupon;
mod m20240301_000006_create_service_request;
mod m20240301_000007_create_payment;
mod m20240301_000008_create_notification;
mod m20240301_000009_create_support_chat;
mod m20240301_000010_create_support_message;
mod m20240301_000011_create_system_settings;
mod m20240301_000099_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_user::Migration),
            Box::new(m20240301_000002_create_user_credentials::Migration),
            Box::new(m20240301_000003_create_service_provider::Migration),
            Box::new(m20240301_000004_create_service::Migration),
            Box::new(m20240301_000005_create_coupon::Migration),
            Box::new(m20240301_000006_create_service_request::Migration),
            Box::new(m20240301_000007_create_payment::Migration),
            Box::new(m20240301_000008_create_notification::Migration),
            Box::new(m20240301_000009_create_support_chat::Migration),
            Box::new(m20240301_000010_create_support_message::Migration),
            Box::new(m20240301_000011_create_system_settings::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000099_add_indexes::Migration),
        ]
    }
}
