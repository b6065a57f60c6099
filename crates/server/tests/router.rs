mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use models::enums::Role;
use serde_json::json;
use service::payments::signature;

use common::{json_body, offline, offline_app, send, token_for, WEBHOOK_SECRET};

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = offline_app();
    let res = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({"status": "ok"}));

    let res = send(&app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let text = axum::body::to_bytes(res.into_body(), 1 << 20).await.unwrap();
    assert!(String::from_utf8_lossy(&text).contains("myserv_http_requests_total"));
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = offline_app();
    for path in ["/api/auth/me", "/api/requests", "/api/notifications/unread-count", "/api/admin/counters"] {
        let res = send(&app, Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body = json_body(res).await;
        assert_eq!(body["success"], json!(false));
    }

    let res = send(
        &app,
        Request::get("/api/requests").header(header::AUTHORIZATION, "Bearer not-a-jwt").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let (app, accounts) = offline();
    for role in [Role::Client, Role::Provider] {
        let (token, _) = token_for(&accounts, role);
        let res = send(
            &app,
            Request::get("/api/admin/users")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn session_cookie_is_accepted_like_a_bearer_token() {
    let (app, accounts) = offline();
    let (token, _) = token_for(&accounts, Role::Client);
    let res = send(
        &app,
        Request::get("/api/admin/payments")
            .header(header::COOKIE, format!("auth_token={token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    // authenticated but not an admin
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_account_token_is_refused() {
    let (app, accounts) = offline();
    let (token, email) = token_for(&accounts, Role::Client);
    let admin_users = || {
        Request::get("/api/admin/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    // session accepted, role refused
    assert_eq!(send(&app, admin_users()).await.status(), StatusCode::FORBIDDEN);

    accounts.set_active(&email, false);
    let res = send(&app, admin_users()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["error"], json!("account disabled"));
}

#[tokio::test]
async fn token_for_unknown_account_is_refused() {
    let (app, _) = offline();
    let (_, other) = offline();
    let (token, _) = token_for(&other, Role::Admin);
    let res = send(
        &app,
        Request::get("/api/admin/counters")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_settings_come_from_memory() {
    let app = offline_app();
    let res = send(&app, Request::get("/api/settings/public").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["platform_fee_percent"], json!(10));
    assert_eq!(body["data"]["maintenance_mode"], json!(false));
}

#[tokio::test]
async fn webhook_ignores_other_topics() {
    let app = offline_app();
    let v1 = signature::sign(WEBHOOK_SECRET, "1", "req-7", "1700000000").unwrap();
    let res = send(
        &app,
        Request::post("/api/payments/webhook?type=merchant_order&data.id=1")
            .header("x-signature", format!("ts=1700000000,v1={v1}"))
            .header("x-request-id", "req-7")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["data"]["outcome"], json!("ignored"));
}

#[tokio::test]
async fn webhook_rejects_bad_signatures() {
    let app = offline_app();
    let res = send(
        &app,
        Request::post("/api/payments/webhook?type=payment&data.id=123")
            .header("x-signature", "ts=1700000000,v1=deadbeef")
            .header("x-request-id", "req-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(&app, Request::post("/api/payments/webhook?type=payment&data.id=123").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // unsigned notifications are refused whatever their topic
    let res = send(&app, Request::post("/api/payments/webhook?type=merchant_order&data.id=1").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_lists_public_paths() {
    let app = offline_app();
    let res = send(&app, Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let doc = json_body(res).await;
    assert!(doc["paths"]["/api/services"].is_object());
    assert!(doc["paths"]["/api/payments/webhook"].is_object());
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = offline_app();
    let res = send(&app, Request::post("/api/auth/logout").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let cookie = res.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));
}
