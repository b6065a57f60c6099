use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::enums::Role;
use crate::errors;

pub const UF_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed role; rows written through `create` always hold a valid value.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Client)
    }
}

pub fn validate_email(email: &str) -> Result<(), errors::ModelError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid || email.len() > 255 || email.contains(char::is_whitespace) {
        return Err(errors::ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let len = name.trim().chars().count();
    if len == 0 { return Err(errors::ModelError::Validation("name required".into())); }
    if len > 128 { return Err(errors::ModelError::Validation("name too long (<=128)".into())); }
    Ok(())
}

/// Two-letter Brazilian state code, returned upper-cased.
pub fn validate_state(uf: &str) -> Result<String, errors::ModelError> {
    let up = uf.trim().to_ascii_uppercase();
    if !UF_CODES.contains(&up.as_str()) {
        return Err(errors::ModelError::Validation(format!("invalid state: {uf}")));
    }
    Ok(up)
}

/// Keeps digits only; 10 or 11 digits with area code.
pub fn normalize_phone(phone: &str) -> Result<String, errors::ModelError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(10..=11).contains(&digits.len()) {
        return Err(errors::ModelError::Validation("phone must have 10 or 11 digits".into()));
    }
    Ok(digits)
}

pub async fn create(db: &DatabaseConnection, email: &str, name: &str, role: Role) -> Result<Model, errors::ModelError> {
    validate_email(email)?;
    validate_name(name)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.trim().to_lowercase()),
        name: Set(name.trim().to_string()),
        phone: Set(None),
        city: Set(None),
        state: Set(None),
        role: Set(role.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn set_active(db: &DatabaseConnection, id: Uuid, active: bool) -> Result<Model, errors::ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id).one(db).await?
        .ok_or_else(|| errors::ModelError::Validation("user not found".into()))?
        .into();
    found.is_active = Set(active);
    found.updated_at = Set(Utc::now().into());
    Ok(found.update(db).await?)
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), errors::ModelError> {
    Entity::delete_by_id(id).exec(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana silva@example.com").is_err());
    }

    #[test]
    fn state_is_upper_cased() {
        assert_eq!(validate_state("sp").unwrap(), "SP");
        assert!(validate_state("XX").is_err());
    }

    #[test]
    fn phone_keeps_digits() {
        assert_eq!(normalize_phone("(11) 98765-4321").unwrap(), "11987654321");
        assert!(normalize_phone("12345").is_err());
    }
}
