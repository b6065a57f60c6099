use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: &[(&str, &str, &[&str])] = &[
    ("idx_provider_status", "service_provider", &["status"]),
    ("idx_service_provider", "service", &["provider_id"]),
    ("idx_service_category", "service", &["category"]),
    ("idx_request_client", "service_request", &["client_id", "created_at"]),
    ("idx_request_provider", "service_request", &["provider_id", "created_at"]),
    ("idx_payment_request", "payment", &["service_request_id"]),
    ("idx_notification_user_read", "notification", &["user_id", "read_at"]),
    ("idx_chat_status", "support_chat", &["status", "assigned_admin_id"]),
    ("idx_chat_user", "support_chat", &["user_id"]),
    ("idx_message_chat", "support_message", &["chat_id", "created_at"]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, cols) in INDEXES {
            let mut idx = Index::create();
            idx.name(*name).table(Alias::new(*table)).if_not_exists();
            for col in cols.iter() {
                idx.col(Alias::new(*col));
            }
            manager.create_index(idx.to_owned()).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES {
            manager
                .drop_index(Index::drop().name(*name).table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
