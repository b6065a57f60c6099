use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::enums::ProviderStatus;
use crate::{errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_provider")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub display_name: String,
    pub bio: String,
    pub document: String,
    pub city: String,
    pub state: String,
    pub status: String,
    pub moderated_by: Option<Uuid>,
    pub moderated_at: Option<DateTimeWithTimeZone>,
    pub moderation_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> ProviderStatus {
        self.status.parse().unwrap_or(ProviderStatus::Pending)
    }

    pub fn is_approved(&self) -> bool {
        self.status() == ProviderStatus::Approved
    }
}

/// CPF (11 digits) or CNPJ (14 digits); punctuation is stripped.
pub fn normalize_document(doc: &str) -> Result<String, errors::ModelError> {
    let digits: String = doc.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 11 && digits.len() != 14 {
        return Err(errors::ModelError::Validation("document must be a CPF (11 digits) or CNPJ (14 digits)".into()));
    }
    if digits.chars().all(|c| Some(c) == digits.chars().next()) {
        return Err(errors::ModelError::Validation("document digits cannot all be equal".into()));
    }
    Ok(digits)
}

pub struct NewProvider<'a> {
    pub user_id: Uuid,
    pub display_name: &'a str,
    pub bio: &'a str,
    pub document: &'a str,
    pub city: &'a str,
    pub state: &'a str,
}

pub async fn create(db: &DatabaseConnection, input: NewProvider<'_>) -> Result<Model, errors::ModelError> {
    user::validate_name(input.display_name)?;
    let document = normalize_document(input.document)?;
    let state = user::validate_state(input.state)?;
    if input.city.trim().is_empty() {
        return Err(errors::ModelError::Validation("city required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        display_name: Set(input.display_name.trim().to_string()),
        bio: Set(input.bio.trim().to_string()),
        document: Set(document),
        city: Set(input.city.trim().to_string()),
        state: Set(state),
        status: Set(ProviderStatus::Pending.as_str().to_string()),
        moderated_by: Set(None),
        moderated_at: Set(None),
        moderation_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_user(db: &DatabaseConnection, user_id: Uuid) -> Result<Option<Model>, errors::ModelError> {
    Ok(Entity::find().filter(Column::UserId.eq(user_id)).one(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_accepts_cpf_and_cnpj() {
        assert_eq!(normalize_document("123.456.789-09").unwrap(), "12345678909");
        assert_eq!(normalize_document("12.345.678/0001-95").unwrap(), "12345678000195");
    }

    #[test]
    fn document_rejects_wrong_length_and_repeats() {
        assert!(normalize_document("1234").is_err());
        assert!(normalize_document("111.111.111-11").is_err());
    }
}
