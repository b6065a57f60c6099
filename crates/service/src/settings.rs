//! Platform settings: the single `system_settings` row and its in-memory snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use models::system_settings::{self, MAX_FEE_PERCENT, SINGLETON_ID};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const DEFAULT_FEE_PERCENT: i32 = 10;
pub const DEFAULT_SUPPORT_EMAIL: &str = "suporte@myserv.com.br";

/// What anonymous clients may see.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicSettings {
    pub platform_fee_percent: i32,
    pub maintenance_mode: bool,
    pub support_email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub platform_fee_percent: Option<i32>,
    pub maintenance_mode: Option<bool>,
    pub support_email: Option<String>,
}

pub fn validate_fee(percent: i32) -> Result<(), ServiceError> {
    if !(0..=MAX_FEE_PERCENT).contains(&percent) {
        return Err(ServiceError::Validation(format!("platform fee must be within 0..={MAX_FEE_PERCENT}")));
    }
    Ok(())
}

fn defaults() -> system_settings::Model {
    system_settings::Model {
        id: SINGLETON_ID,
        platform_fee_percent: DEFAULT_FEE_PERCENT,
        maintenance_mode: false,
        support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
        updated_by: None,
        updated_at: Utc::now().into(),
    }
}

/// Cached settings row. Reads are lock-free; writers go through [`SettingsStore::update`].
#[derive(Clone)]
pub struct SettingsStore {
    current: Arc<ArcSwap<system_settings::Model>>,
}

impl SettingsStore {
    /// Store seeded with defaults, used until the first `refresh`.
    pub fn with_defaults() -> Self {
        Self { current: Arc::new(ArcSwap::from_pointee(defaults())) }
    }

    /// Load the row, creating it with defaults if the seed is missing.
    pub async fn load(db: &DatabaseConnection) -> Result<Self, ServiceError> {
        let store = Self::with_defaults();
        store.refresh(db).await?;
        Ok(store)
    }

    pub async fn refresh(&self, db: &DatabaseConnection) -> Result<Arc<system_settings::Model>, ServiceError> {
        let row = match system_settings::Entity::find_by_id(SINGLETON_ID).one(db).await? {
            Some(row) => row,
            None => {
                let d = defaults();
                system_settings::ActiveModel {
                    id: Set(d.id),
                    platform_fee_percent: Set(d.platform_fee_percent),
                    maintenance_mode: Set(d.maintenance_mode),
                    support_email: Set(d.support_email),
                    updated_by: Set(None),
                    updated_at: Set(d.updated_at),
                }
                .insert(db)
                .await?
            }
        };
        let row = Arc::new(row);
        self.current.store(row.clone());
        Ok(row)
    }

    pub fn get(&self) -> Arc<system_settings::Model> {
        self.current.load_full()
    }

    pub fn fee_percent(&self) -> i32 {
        self.current.load().platform_fee_percent
    }

    pub fn public_view(&self) -> PublicSettings {
        let s = self.current.load();
        PublicSettings {
            platform_fee_percent: s.platform_fee_percent,
            maintenance_mode: s.maintenance_mode,
            support_email: s.support_email.clone(),
        }
    }

    /// Persist an admin change and swap the snapshot.
    #[instrument(skip(self, db, input))]
    pub async fn update(&self, db: &DatabaseConnection, admin_id: Uuid, input: SettingsUpdate) -> Result<Arc<system_settings::Model>, ServiceError> {
        if let Some(fee) = input.platform_fee_percent {
            validate_fee(fee)?;
        }
        let email = match input.support_email {
            Some(e) => {
                let e = e.trim().to_lowercase();
                models::user::validate_email(&e)?;
                Some(e)
            }
            None => None,
        };
        let row = self.refresh(db).await?;
        let mut am: system_settings::ActiveModel = (*row).clone().into();
        if let Some(fee) = input.platform_fee_percent {
            am.platform_fee_percent = Set(fee);
        }
        if let Some(m) = input.maintenance_mode {
            am.maintenance_mode = Set(m);
        }
        if let Some(e) = email {
            am.support_email = Set(e);
        }
        am.updated_by = Set(Some(admin_id));
        am.updated_at = Set(Utc::now().into());
        let saved = Arc::new(am.update(db).await?);
        self.current.store(saved.clone());
        info!(%admin_id, fee = saved.platform_fee_percent, maintenance = saved.maintenance_mode, "settings_updated");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[test]
    fn fee_bounds() {
        assert!(validate_fee(0).is_ok());
        assert!(validate_fee(50).is_ok());
        assert!(validate_fee(51).is_err());
        assert!(validate_fee(-1).is_err());
    }

    #[test]
    fn defaults_until_loaded() {
        let store = SettingsStore::with_defaults();
        assert_eq!(store.fee_percent(), DEFAULT_FEE_PERCENT);
        assert_eq!(store.public_view().support_email, DEFAULT_SUPPORT_EMAIL);
    }

    #[tokio::test]
    async fn update_swaps_snapshot() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };

        let store = SettingsStore::load(&db).await?;
        let before = store.get();
        let admin = Uuid::new_v4();

        let bad = store.update(&db, admin, SettingsUpdate { platform_fee_percent: Some(80), ..Default::default() }).await;
        assert!(bad.is_err());

        let saved = store.update(&db, admin, SettingsUpdate { platform_fee_percent: Some(12), ..Default::default() }).await?;
        assert_eq!(saved.platform_fee_percent, 12);
        assert_eq!(store.fee_percent(), 12);

        store.update(&db, admin, SettingsUpdate { platform_fee_percent: Some(before.platform_fee_percent), ..Default::default() }).await?;
        Ok(())
    }
}
