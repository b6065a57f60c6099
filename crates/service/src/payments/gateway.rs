use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Checkout preference to create at the payment provider.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    /// Our payment id; the provider echoes it back on every notification.
    pub external_reference: String,
    pub title: String,
    pub amount_cents: i64,
    pub payer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Preference {
    pub id: String,
    pub checkout_url: String,
}

/// Payment as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub external_reference: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, req: PreferenceRequest) -> Result<Preference, ServiceError>;
    async fn get_payment(&self, id: &str) -> Result<GatewayPayment, ServiceError>;
}

/// In-memory gateway for tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockGateway {
        payments: Mutex<HashMap<String, GatewayPayment>>,
        preferences: Mutex<Vec<PreferenceRequest>>,
    }

    impl MockGateway {
        /// Register (or overwrite) what `get_payment(id)` returns.
        pub fn set_payment(&self, id: &str, status: &str, external_reference: &str) {
            self.payments.lock().unwrap().insert(id.to_string(), GatewayPayment {
                id: id.to_string(),
                status: status.to_string(),
                external_reference: Some(external_reference.to_string()),
            });
        }

        pub fn preferences(&self) -> Vec<PreferenceRequest> {
            self.preferences.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_preference(&self, req: PreferenceRequest) -> Result<Preference, ServiceError> {
            let id = format!("pref-{}", req.external_reference);
            let checkout_url = format!("https://checkout.example/{id}");
            self.preferences.lock().unwrap().push(req);
            Ok(Preference { id, checkout_url })
        }

        async fn get_payment(&self, id: &str) -> Result<GatewayPayment, ServiceError> {
            self.payments
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| ServiceError::Gateway(format!("unknown payment {id}")))
        }
    }
}
