pub mod errors;
pub mod db;
pub mod enums;
pub mod user;
pub mod user_credentials;
pub mod service_provider;
pub mod service;
pub mod service_request;
pub mod payment;
pub mod coupon;
pub mod system_settings;
pub mod notification;
pub mod support_chat;
pub mod support_message;

#[cfg(test)]
mod tests;
