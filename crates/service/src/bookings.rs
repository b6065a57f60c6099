//! Service requests: creation with optional coupon, the status state machine and listings.

use chrono::{DateTime, FixedOffset, Utc};
use common::metrics::BOOKINGS_TOTAL;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::RequestStatus;
use models::{coupon, service, service_provider, service_request};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::domain::AuthUser;
use crate::errors::ServiceError;
use crate::notifications::{self, kinds, NewNotification};
use crate::pricing::{self, Quote};
use crate::providers;

const MAX_ADDRESS_CHARS: usize = 255;
const MAX_NOTES_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingInput {
    pub service_id: Uuid,
    pub scheduled_for: DateTime<FixedOffset>,
    pub address: String,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Accept,
    Reject,
    Start,
    Complete,
    Cancel,
}

/// Which side of a booking the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Client,
    Provider,
}

/// State machine for service requests.
pub fn next_status(party: Party, current: RequestStatus, action: BookingAction) -> Result<RequestStatus, ServiceError> {
    use BookingAction::*;
    use RequestStatus as S;
    let next = match (party, current, action) {
        (Party::Provider, S::Pending, Accept) => S::Accepted,
        (Party::Provider, S::Pending, Reject) => S::Rejected,
        (Party::Provider, S::Accepted, Start) => S::InProgress,
        (Party::Provider, S::InProgress, Complete) => S::Completed,
        (Party::Provider, S::Accepted, Cancel) => S::Cancelled,
        (Party::Client, S::Pending | S::Accepted, Cancel) => S::Cancelled,
        (_, current, action) => {
            return Err(ServiceError::Validation(format!("{action:?} is not allowed while the request is {current}").to_lowercase()))
        }
    };
    Ok(next)
}

fn party_of(actor: &AuthUser, req: &service_request::Model, provider: &service_provider::Model) -> Option<Party> {
    if actor.id == req.client_id {
        Some(Party::Client)
    } else if actor.id == provider.user_id {
        Some(Party::Provider)
    } else {
        None
    }
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<(service_request::Model, service_provider::Model), ServiceError> {
    let (req, provider) = service_request::Entity::find_by_id(id)
        .find_also_related(service_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service request"))?;
    let provider = provider.ok_or_else(|| ServiceError::not_found("provider"))?;
    Ok((req, provider))
}

/// Book a service. The coupon usage and the insert commit together.
#[instrument(skip(db, input), fields(client_id = %actor.id, service_id = %input.service_id))]
pub async fn create(db: &DatabaseConnection, actor: &AuthUser, input: BookingInput) -> Result<service_request::Model, ServiceError> {
    if actor.is_admin() {
        return Err(ServiceError::forbidden("admins cannot book services"));
    }
    let (svc, provider) = service::Entity::find_by_id(input.service_id)
        .find_also_related(service_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    let provider = match provider {
        Some(p) if svc.is_active && p.is_approved() => p,
        _ => return Err(ServiceError::validation("service is not available")),
    };
    if provider.user_id == actor.id {
        return Err(ServiceError::forbidden("providers cannot book their own services"));
    }
    let now: DateTime<FixedOffset> = Utc::now().into();
    if input.scheduled_for <= now {
        return Err(ServiceError::validation("scheduled_for must be in the future"));
    }
    let address = input.address.trim().to_string();
    if address.is_empty() || address.chars().count() > MAX_ADDRESS_CHARS {
        return Err(ServiceError::validation("address is required"));
    }
    let notes = input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
        return Err(ServiceError::validation("notes are too long"));
    }
    let code = input.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let txn = db.begin().await?;
    let (quote, coupon_id) = match code {
        Some(code) => {
            let code = coupon::normalize_code(code)?;
            let c = coupon::Entity::find()
                .filter(coupon::Column::Code.eq(code))
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("coupon"))?;
            let quote = pricing::apply_coupon(&c, svc.price_cents, now)?;
            coupon::Entity::update_many()
                .col_expr(coupon::Column::UsedCount, Expr::col(coupon::Column::UsedCount).add(1))
                .col_expr(coupon::Column::UpdatedAt, Expr::value(now))
                .filter(coupon::Column::Id.eq(c.id))
                .exec(&txn)
                .await?;
            (quote, Some(c.id))
        }
        None => (Quote::without_discount(svc.price_cents), None),
    };
    let am = service_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(actor.id),
        provider_id: Set(provider.id),
        service_id: Set(svc.id),
        status: Set(RequestStatus::Pending.as_str().to_string()),
        scheduled_for: Set(input.scheduled_for),
        address: Set(address),
        notes: Set(notes),
        subtotal_cents: Set(quote.subtotal_cents),
        discount_cents: Set(quote.discount_cents),
        total_cents: Set(quote.total_cents),
        coupon_id: Set(coupon_id),
        paid_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = am.insert(&txn).await?;
    txn.commit().await?;

    BOOKINGS_TOTAL.with_label_values(&[RequestStatus::Pending.as_str()]).inc();
    info!(request_id = %created.id, total_cents = created.total_cents, "booking_created");
    notifications::notify_best_effort(db, NewNotification {
        user_id: provider.user_id,
        kind: kinds::REQUEST_CREATED,
        title: "Nova solicitação de serviço".into(),
        body: format!("{} solicitou \"{}\".", actor.name, svc.title),
        link: Some(format!("/provider/requests/{}", created.id)),
    }).await;
    Ok(created)
}

/// Move a request through the state machine on behalf of the client or the provider.
#[instrument(skip(db), fields(user_id = %actor.id))]
pub async fn transition(db: &DatabaseConnection, actor: &AuthUser, id: Uuid, action: BookingAction) -> Result<service_request::Model, ServiceError> {
    let (req, provider) = load(db, id).await?;
    let party = party_of(actor, &req, &provider).ok_or_else(|| ServiceError::forbidden("not a party to this request"))?;
    let next = next_status(party, req.status(), action)?;
    let client_id = req.client_id;
    let updated = set_status_if(db, id, req.status(), next).await?;

    BOOKINGS_TOTAL.with_label_values(&[next.as_str()]).inc();
    info!(request_id = %updated.id, status = %next, "booking_transition");
    let (recipient, link) = match party {
        Party::Client => (provider.user_id, format!("/provider/requests/{}", updated.id)),
        Party::Provider => (client_id, format!("/requests/{}", updated.id)),
    };
    notifications::notify_best_effort(db, NewNotification {
        user_id: recipient,
        kind: kinds::REQUEST_UPDATED,
        title: "Solicitação atualizada".into(),
        body: format!("A solicitação agora está: {next}."),
        link: Some(link),
    }).await;
    Ok(updated)
}

/// Compare-and-set on the status column; fails when another action moved the request first.
async fn set_status_if(
    db: &DatabaseConnection,
    id: Uuid,
    from: RequestStatus,
    to: RequestStatus,
) -> Result<service_request::Model, ServiceError> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let res = service_request::Entity::update_many()
        .col_expr(service_request::Column::Status, Expr::value(to.as_str()))
        .col_expr(service_request::Column::UpdatedAt, Expr::value(now))
        .filter(service_request::Column::Id.eq(id))
        .filter(service_request::Column::Status.eq(from.as_str()))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::Validation(format!("request is no longer {from}")));
    }
    service_request::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service request"))
}

/// Visible to the client, the provider and admins.
pub async fn get(db: &DatabaseConnection, actor: &AuthUser, id: Uuid) -> Result<service_request::Model, ServiceError> {
    let (req, provider) = load(db, id).await?;
    if actor.is_admin() || party_of(actor, &req, &provider).is_some() {
        Ok(req)
    } else {
        Err(ServiceError::not_found("service request"))
    }
}

async fn page_of(
    db: &DatabaseConnection,
    column: service_request::Column,
    owner: Uuid,
    status: Option<RequestStatus>,
    opts: Pagination,
) -> Result<Page<service_request::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = service_request::Entity::find().filter(column.eq(owner));
    if let Some(status) = status {
        q = q.filter(service_request::Column::Status.eq(status.as_str()));
    }
    let paginator = q.order_by_desc(service_request::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

pub async fn list_for_client(
    db: &DatabaseConnection,
    actor: &AuthUser,
    status: Option<RequestStatus>,
    opts: Pagination,
) -> Result<Page<service_request::Model>, ServiceError> {
    page_of(db, service_request::Column::ClientId, actor.id, status, opts).await
}

pub async fn list_for_provider(
    db: &DatabaseConnection,
    actor: &AuthUser,
    status: Option<RequestStatus>,
    opts: Pagination,
) -> Result<Page<service_request::Model>, ServiceError> {
    let provider = providers::get_own(db, actor).await?;
    page_of(db, service_request::Column::ProviderId, provider.id, status, opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingAction::*;
    use RequestStatus as S;

    #[test]
    fn provider_walks_the_happy_path() {
        let mut s = S::Pending;
        for action in [Accept, Start, Complete] {
            s = next_status(Party::Provider, s, action).unwrap();
        }
        assert_eq!(s, S::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn cancellation_rules() {
        assert_eq!(next_status(Party::Client, S::Pending, Cancel).unwrap(), S::Cancelled);
        assert_eq!(next_status(Party::Client, S::Accepted, Cancel).unwrap(), S::Cancelled);
        assert!(next_status(Party::Client, S::InProgress, Cancel).is_err());
        assert_eq!(next_status(Party::Provider, S::Accepted, Cancel).unwrap(), S::Cancelled);
        assert!(next_status(Party::Provider, S::Pending, Cancel).is_err());
    }

    #[test]
    fn clients_cannot_drive_provider_actions() {
        for action in [Accept, Reject, Start, Complete] {
            assert!(next_status(Party::Client, S::Pending, action).is_err());
        }
    }

    #[test]
    fn terminal_states_are_final() {
        for s in [S::Rejected, S::Completed, S::Cancelled] {
            for action in [Accept, Reject, Start, Complete, Cancel] {
                assert!(next_status(Party::Provider, s, action).is_err());
                assert!(next_status(Party::Client, s, action).is_err());
            }
        }
    }

    mod db {
        use super::super::*;
        use crate::catalog::{self, ServiceInput};
        use crate::coupons::{self, CouponInput};
        use crate::providers::{self, ModerationAction, ProviderInput};
        use crate::test_support::get_db;
        use chrono::Duration;
        use models::enums::{DiscountType, Role};
        use models::user;

        fn auth_user(u: &user::Model) -> AuthUser {
            AuthUser { id: u.id, email: u.email.clone(), name: u.name.clone(), role: u.role() }
        }

        #[tokio::test]
        async fn booking_with_coupon_counts_usage() -> Result<(), anyhow::Error> {
            let Some(db) = get_db().await else { return Ok(()) };

            let tag = Uuid::new_v4().simple().to_string();
            let pu = user::create(&db, &format!("bk_p_{tag}@example.com"), "Bk Provider", Role::Provider).await?;
            let cu = user::create(&db, &format!("bk_c_{tag}@example.com"), "Bk Client", Role::Client).await?;
            let au = user::create(&db, &format!("bk_a_{tag}@example.com"), "Bk Admin", Role::Admin).await?;
            let (provider_actor, client, admin) = (auth_user(&pu), auth_user(&cu), auth_user(&au));

            let profile = providers::apply(&db, &provider_actor, ProviderInput {
                display_name: "Encanador".into(),
                bio: String::new(),
                document: "529.982.247-25".into(),
                city: "Recife".into(),
                state: "PE".into(),
            }).await?;
            providers::moderate(&db, &admin, profile.id, ModerationAction::Approve, None).await?;
            let svc = catalog::create(&db, &provider_actor, ServiceInput {
                title: "Conserto de vazamento".into(),
                description: String::new(),
                category: "hidraulica".into(),
                price_cents: 15_000,
            }).await?;
            let code = format!("BK{}", &tag[..10]);
            let promo = coupons::create(&db, CouponInput {
                code: code.clone(),
                discount_type: DiscountType::Fixed,
                discount_value: 5_000,
                min_order_cents: None,
                max_uses: Some(1),
                expires_at: None,
            }).await?;

            let input = |coupon_code: Option<String>| BookingInput {
                service_id: svc.id,
                scheduled_for: (Utc::now() + Duration::days(1)).into(),
                address: "Av. Boa Viagem, 100".into(),
                notes: Some("portão azul".into()),
                coupon_code,
            };

            let own = create(&db, &provider_actor, input(None)).await;
            assert!(matches!(own, Err(ServiceError::Forbidden(_))));

            let mut past = input(None);
            past.scheduled_for = (Utc::now() - Duration::hours(1)).into();
            assert!(matches!(create(&db, &client, past).await, Err(ServiceError::Validation(_))));

            let req = create(&db, &client, input(Some(code.to_lowercase()))).await?;
            assert_eq!((req.subtotal_cents, req.discount_cents, req.total_cents), (15_000, 5_000, 10_000));
            assert_eq!(req.coupon_id, Some(promo.id));
            let used = coupon::Entity::find_by_id(promo.id).one(&db).await?.map(|c| c.used_count);
            assert_eq!(used, Some(1));
            assert!(create(&db, &client, input(Some(code.clone()))).await.is_err());

            assert!(matches!(transition(&db, &client, req.id, BookingAction::Accept).await, Err(ServiceError::Validation(_))));
            let accepted = transition(&db, &provider_actor, req.id, BookingAction::Accept).await?;
            assert_eq!(accepted.status(), RequestStatus::Accepted);

            // a writer that read the request while still pending loses
            let stale = set_status_if(&db, req.id, RequestStatus::Pending, RequestStatus::Rejected).await;
            assert!(matches!(stale, Err(ServiceError::Validation(_))));
            assert_eq!(get(&db, &client, req.id).await?.status(), RequestStatus::Accepted);
            let page = list_for_provider(&db, &provider_actor, Some(RequestStatus::Accepted), Pagination::default()).await?;
            assert_eq!(page.total, 1);
            assert_eq!(list_for_client(&db, &client, None, Pagination::default()).await?.total, 1);
            assert!(get(&db, &admin, req.id).await.is_ok());

            for id in [cu.id, pu.id, au.id] {
                user::hard_delete(&db, id).await?;
            }
            coupon::Entity::delete_by_id(promo.id).exec(&db).await?;
            Ok(())
        }
    }
}
