use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Extension;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::PaymentStatus;
use models::payment;
use serde::Deserialize;
use serde_json::Value;
use service::auth::domain::AuthUser;
use service::payments::{self, WebhookNotification, WebhookOutcome};
use tracing::info;
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<PaymentStatus>,
}

/// Query string of a Mercado Pago notification (`?type=payment&data.id=123` or `?topic=payment&id=123`).
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub topic: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
    pub id: Option<String>,
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merge query string, JSON body and headers; the query string wins, as it is what gets signed.
pub fn notification_from(query: WebhookQuery, headers: &HeaderMap, body: &[u8]) -> WebhookNotification {
    let body: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let topic = query
        .kind
        .or(query.topic)
        .or_else(|| body.get("type").and_then(value_to_string))
        .or_else(|| body.get("topic").and_then(value_to_string));
    let data_id = query
        .data_id
        .or(query.id)
        .or_else(|| body.get("data").and_then(|d| d.get("id")).and_then(value_to_string));
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    WebhookNotification { topic, data_id, signature: header("x-signature"), request_id: header("x-request-id") }
}

pub async fn checkout(State(state): State<ServerState>, Extension(user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<payment::Model> {
    ok(payments::checkout(&state.db, state.payments.as_ref(), &state.settings, &user, id).await?)
}

pub async fn list_for_request(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<payment::Model>> {
    ok(payments::list_for_request(&state.db, &user, id).await?)
}

#[utoipa::path(post, path = "/api/payments/webhook", tag = "payments", responses((status = 200, description = "Processed or ignored"), (status = 401, description = "Bad signature"), (status = 502, description = "Gateway lookup failed")))]
pub async fn webhook(
    State(state): State<ServerState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookOutcome> {
    let note = notification_from(query, &headers, &body);
    let outcome = payments::handle_webhook(&state.db, state.payments.as_ref(), &state.webhook_secret, note).await?;
    info!(?outcome, "payment_webhook_handled");
    ok(outcome)
}

pub async fn admin_list(
    State(state): State<ServerState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Page<payment::Model>> {
    ok(payments::list(&state.db, filter.status, page).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_string_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-signature", HeaderValue::from_static("ts=1,v1=ab"));
        headers.insert("x-request-id", HeaderValue::from_static("req-9"));
        let q = WebhookQuery { kind: Some("payment".into()), data_id: Some("42".into()), ..Default::default() };
        let n = notification_from(q, &headers, br#"{"type":"payment","data":{"id":"7"}}"#);
        assert_eq!(n.topic.as_deref(), Some("payment"));
        assert_eq!(n.data_id.as_deref(), Some("42"));
        assert_eq!(n.signature.as_deref(), Some("ts=1,v1=ab"));
        assert_eq!(n.request_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn body_only_notifications_with_numeric_ids() {
        let n = notification_from(WebhookQuery::default(), &HeaderMap::new(), br#"{"type":"payment","data":{"id":123}}"#);
        assert_eq!(n.topic.as_deref(), Some("payment"));
        assert_eq!(n.data_id.as_deref(), Some("123"));
        let n = notification_from(WebhookQuery::default(), &HeaderMap::new(), b"not json");
        assert!(n.topic.is_none());
    }
}
