//! Checkout and payment status tracking through Mercado Pago.

pub mod gateway;
pub mod mercadopago;
pub mod signature;

pub use gateway::{GatewayPayment, PaymentGateway, Preference, PreferenceRequest};
pub use mercadopago::MercadoPagoClient;

use chrono::Utc;
use common::metrics::PAYMENT_EVENTS_TOTAL;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::{PaymentStatus, RequestStatus};
use models::{payment, service, service_provider, service_request};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::domain::AuthUser;
use crate::bookings;
use crate::errors::ServiceError;
use crate::notifications::{self, kinds, NewNotification};
use crate::pricing;
use crate::settings::SettingsStore;

/// Notification as posted by Mercado Pago, merged from query string and body by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookNotification {
    /// `type` (newer webhooks) or `topic` (IPN).
    pub topic: Option<String>,
    pub data_id: Option<String>,
    pub signature: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Ignored,
    Unchanged,
    Updated(PaymentStatus),
}

fn payable(status: RequestStatus) -> bool {
    matches!(status, RequestStatus::Accepted | RequestStatus::InProgress | RequestStatus::Completed)
}

/// Start (or resume) checkout for one of the caller's bookings.
#[instrument(skip(db, gateway, settings), fields(client_id = %actor.id))]
pub async fn checkout(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    settings: &SettingsStore,
    actor: &AuthUser,
    request_id: Uuid,
) -> Result<payment::Model, ServiceError> {
    let req = service_request::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .filter(|r| r.client_id == actor.id)
        .ok_or_else(|| ServiceError::not_found("service request"))?;
    if !payable(req.status()) {
        return Err(ServiceError::Validation(format!("a {} request cannot be paid", req.status())));
    }
    if req.paid_at.is_some() {
        return Err(ServiceError::Conflict("service request is already paid".into()));
    }
    if req.total_cents <= 0 {
        return Err(ServiceError::validation("nothing to pay"));
    }

    let open = payment::Entity::find()
        .filter(payment::Column::ServiceRequestId.eq(req.id))
        .filter(payment::Column::Status.is_in([PaymentStatus::Pending.as_str(), PaymentStatus::InProcess.as_str()]))
        .filter(payment::Column::CheckoutUrl.is_not_null())
        .order_by_desc(payment::Column::CreatedAt)
        .one(db)
        .await?;
    if let Some(existing) = open {
        return Ok(existing);
    }

    let title = service::Entity::find_by_id(req.service_id)
        .one(db)
        .await?
        .map(|s| s.title)
        .unwrap_or_else(|| "Serviço MyServ".to_string());
    let now = Utc::now();
    let pending = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        service_request_id: Set(req.id),
        payer_id: Set(actor.id),
        amount_cents: Set(req.total_cents),
        platform_fee_cents: Set(pricing::platform_fee(req.total_cents, settings.fee_percent())),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        gateway: Set(payment::GATEWAY_MERCADOPAGO.to_string()),
        preference_id: Set(None),
        external_id: Set(None),
        checkout_url: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    let pref = gateway
        .create_preference(PreferenceRequest {
            external_reference: pending.id.to_string(),
            title,
            amount_cents: pending.amount_cents,
            payer_email: actor.email.clone(),
        })
        .await;
    let mut am: payment::ActiveModel = pending.into();
    am.updated_at = Set(Utc::now().into());
    match pref {
        Ok(pref) => {
            am.preference_id = Set(Some(pref.id));
            am.checkout_url = Set(Some(pref.checkout_url));
            let saved = am.update(db).await?;
            info!(payment_id = %saved.id, request_id = %req.id, amount_cents = saved.amount_cents, "checkout_created");
            Ok(saved)
        }
        Err(e) => {
            am.status = Set(PaymentStatus::Cancelled.as_str().to_string());
            am.update(db).await?;
            warn!(request_id = %req.id, error = %e, "checkout_failed");
            Err(e)
        }
    }
}

/// Apply a gateway notification. Re-deliveries of a known status and late updates that
/// would reopen a settled payment change nothing.
#[instrument(skip(db, gateway, webhook_secret, note), fields(data_id = ?note.data_id))]
pub async fn handle_webhook(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    webhook_secret: &str,
    note: WebhookNotification,
) -> Result<WebhookOutcome, ServiceError> {
    let data_id = note.data_id.as_deref().map(str::trim).filter(|d| !d.is_empty());
    if !webhook_secret.is_empty() {
        let header = note.signature.as_deref().ok_or(ServiceError::Unauthorized)?;
        signature::verify(
            webhook_secret,
            header,
            data_id.unwrap_or_default(),
            note.request_id.as_deref().unwrap_or_default(),
        )?;
    }
    if note.topic.as_deref() != Some("payment") {
        return Ok(WebhookOutcome::Ignored);
    }
    let data_id = data_id.ok_or_else(|| ServiceError::validation("missing data.id"))?;

    let remote = gateway.get_payment(data_id).await?;
    let payment_id = remote
        .external_reference
        .as_deref()
        .and_then(|r| Uuid::parse_str(r).ok())
        .ok_or_else(|| ServiceError::validation("payment without a known external_reference"))?;
    let local = payment::Entity::find_by_id(payment_id).one(db).await?.ok_or_else(|| ServiceError::not_found("payment"))?;

    let status = PaymentStatus::from_gateway(&remote.status);
    if local.status() == status && local.external_id.as_deref() == Some(remote.id.as_str()) {
        return Ok(WebhookOutcome::Unchanged);
    }
    if !local.status().can_move_to(status) {
        warn!(%payment_id, from = %local.status(), to = %status, "stale_payment_status_ignored");
        return Ok(WebhookOutcome::Unchanged);
    }

    let txn = db.begin().await?;
    let request_id = local.service_request_id;
    let mut am: payment::ActiveModel = local.into();
    am.status = Set(status.as_str().to_string());
    am.external_id = Set(Some(remote.id.clone()));
    am.updated_at = Set(Utc::now().into());
    am.update(&txn).await?;

    let mut newly_paid = None;
    if status == PaymentStatus::Approved {
        if let Some(req) = service_request::Entity::find_by_id(request_id).one(&txn).await? {
            if req.paid_at.is_none() {
                let mut ram: service_request::ActiveModel = req.clone().into();
                ram.paid_at = Set(Some(Utc::now().into()));
                ram.updated_at = Set(Utc::now().into());
                ram.update(&txn).await?;
                newly_paid = Some(req);
            }
        }
    }
    txn.commit().await?;

    PAYMENT_EVENTS_TOTAL.with_label_values(&[status.as_str()]).inc();
    info!(%payment_id, status = %status, "payment_status_updated");

    if let Some(req) = newly_paid {
        let provider_user = service_provider::Entity::find_by_id(req.provider_id).one(db).await?.map(|p| p.user_id);
        let recipients = [(Some(req.client_id), format!("/requests/{}", req.id)), (provider_user, format!("/provider/requests/{}", req.id))];
        for (user_id, link) in recipients {
            let Some(user_id) = user_id else { continue };
            notifications::notify_best_effort(db, NewNotification {
                user_id,
                kind: kinds::PAYMENT_APPROVED,
                title: "Pagamento aprovado".into(),
                body: format!("O pagamento de R$ {:.2} foi aprovado.", req.total_cents as f64 / 100.0),
                link: Some(link),
            }).await;
        }
    }
    Ok(WebhookOutcome::Updated(status))
}

/// Payments of one booking, visible to its parties and admins.
pub async fn list_for_request(db: &DatabaseConnection, actor: &AuthUser, request_id: Uuid) -> Result<Vec<payment::Model>, ServiceError> {
    bookings::get(db, actor, request_id).await?;
    Ok(payment::Entity::find()
        .filter(payment::Column::ServiceRequestId.eq(request_id))
        .order_by_desc(payment::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list(db: &DatabaseConnection, status: Option<PaymentStatus>, opts: Pagination) -> Result<Page<payment::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = payment::Entity::find();
    if let Some(status) = status {
        q = q.filter(payment::Column::Status.eq(status.as_str()));
    }
    let paginator = q.order_by_desc(payment::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}
