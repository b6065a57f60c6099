//! Mercado Pago REST client (Checkout Pro preferences and payment lookup).

use std::time::Duration;

use async_trait::async_trait;
use configs::PaymentsConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::gateway::{GatewayPayment, PaymentGateway, Preference, PreferenceRequest};
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct MercadoPagoClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
    notification_url: Option<String>,
    success_url: Option<String>,
    failure_url: Option<String>,
    pending_url: Option<String>,
}

#[derive(Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

#[derive(Deserialize)]
struct PaymentResponse {
    // numeric in practice, but documented as string in a few places
    id: Value,
    status: String,
    external_reference: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(cfg: &PaymentsConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Gateway(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            access_token: cfg.access_token.clone(),
            notification_url: cfg.notification_url.clone(),
            success_url: cfg.success_url.clone(),
            failure_url: cfg.failure_url.clone(),
            pending_url: cfg.pending_url.clone(),
        })
    }

    fn token(&self) -> Result<&str, ServiceError> {
        if self.access_token.is_empty() {
            return Err(ServiceError::Gateway("mercado pago access token is not configured".into()));
        }
        Ok(&self.access_token)
    }

    fn preference_body(&self, req: &PreferenceRequest) -> Value {
        let mut body = json!({
            "items": [{
                "id": req.external_reference,
                "title": req.title,
                "quantity": 1,
                "currency_id": "BRL",
                "unit_price": req.amount_cents as f64 / 100.0,
            }],
            "payer": { "email": req.payer_email },
            "external_reference": req.external_reference,
        });
        if let Some(url) = &self.notification_url {
            body["notification_url"] = json!(url);
        }
        if let (Some(success), Some(failure), Some(pending)) = (&self.success_url, &self.failure_url, &self.pending_url) {
            body["back_urls"] = json!({ "success": success, "failure": failure, "pending": pending });
            body["auto_return"] = json!("approved");
        }
        body
    }

    async fn read_error(resp: reqwest::Response) -> ServiceError {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        warn!(%status, body = %text, "mercadopago_error");
        ServiceError::Gateway(format!("mercado pago returned {status}"))
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(&self, req: PreferenceRequest) -> Result<Preference, ServiceError> {
        let url = format!("{}/checkout/preferences", self.api_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.token()?)
            .json(&self.preference_body(&req))
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        let pref: PreferenceResponse = resp.json().await.map_err(|e| ServiceError::Gateway(e.to_string()))?;
        let checkout_url = pref
            .init_point
            .or(pref.sandbox_init_point)
            .ok_or_else(|| ServiceError::Gateway("preference without init_point".into()))?;
        debug!(preference_id = %pref.id, "mercadopago_preference_created");
        Ok(Preference { id: pref.id, checkout_url })
    }

    async fn get_payment(&self, id: &str) -> Result<GatewayPayment, ServiceError> {
        let url = format!("{}/v1/payments/{}", self.api_base, id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token()?)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        let p: PaymentResponse = resp.json().await.map_err(|e| ServiceError::Gateway(e.to_string()))?;
        let id = match p.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(GatewayPayment { id, status: p.status, external_reference: p.external_reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PaymentsConfig {
        PaymentsConfig {
            access_token: String::new(),
            notification_url: Some("https://api.myserv.com.br/api/payments/webhook".into()),
            success_url: Some("https://myserv.com.br/ok".into()),
            failure_url: Some("https://myserv.com.br/fail".into()),
            pending_url: Some("https://myserv.com.br/wait".into()),
            ..PaymentsConfig::default()
        }
    }

    #[test]
    fn preference_body_carries_reference_and_urls() {
        let client = MercadoPagoClient::new(&cfg()).unwrap();
        let body = client.preference_body(&PreferenceRequest {
            external_reference: "abc".into(),
            title: "Faxina".into(),
            amount_cents: 12_345,
            payer_email: "c@example.com".into(),
        });
        assert_eq!(body["external_reference"], "abc");
        assert_eq!(body["items"][0]["unit_price"], 123.45);
        assert_eq!(body["back_urls"]["success"], "https://myserv.com.br/ok");
        assert_eq!(body["auto_return"], "approved");
        assert!(body["notification_url"].is_string());
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let client = MercadoPagoClient::new(&cfg()).unwrap();
        let err = client.get_payment("1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));
    }
}
