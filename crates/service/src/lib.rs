//! Business layer of the marketplace, on top of the `models` entities.
//! - Each module owns one area (auth, catalog, bookings, payments, support, ...).
//! - Operations take the DB handle and the acting user explicitly and return `ServiceError`.
//! - Outbound integrations (Mercado Pago, ViaCEP, IBGE) live behind small clients or traits.

pub mod errors;
pub mod auth;
pub mod users;
pub mod providers;
pub mod catalog;
pub mod pricing;
pub mod bookings;
pub mod coupons;
pub mod settings;
pub mod payments;
pub mod notifications;
pub mod support;
pub mod locations;
#[cfg(test)]
pub mod test_support;

pub use errors::{ServiceError, ServiceResult};
