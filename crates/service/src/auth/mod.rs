//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login and session-token verification for clients, providers and admins.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
