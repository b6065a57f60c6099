mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use migration::MigratorTrait;
use serde_json::json;
use uuid::Uuid;

use common::{db_state, json_body, send};

async fn build_app() -> anyhow::Result<Option<axum::Router>> {
    Ok(build_app_with_db().await?.map(|(app, _)| app))
}

async fn build_app_with_db() -> anyhow::Result<Option<(axum::Router, sea_orm::DatabaseConnection)>> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(None);
    }
    let db = match models::db::connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {e}");
            return Ok(None);
        }
    };
    migration::Migrator::up(&db, None).await?;
    let app = server::routes::build_router(db_state(db.clone()), tower_http::cors::CorsLayer::very_permissive());
    Ok(Some((app, db)))
}

fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn register_login_and_me() -> anyhow::Result<()> {
    let Some(app) = build_app().await? else { return Ok(()) };

    let email = format!("user_{}@example.com", Uuid::new_v4());
    let password = "S3curePass!";

    let res = send(&app, post_json("/api/auth/register", json!({"email": email, "name": "Tester", "password": password}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["data"]["role"], json!("client"));

    let res = send(&app, post_json("/api/auth/register", json!({"email": email, "name": "Again", "password": password}))).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = send(&app, post_json("/api/auth/login", json!({"email": email, "password": "wrong-password"}))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(&app, post_json("/api/auth/login", json!({"email": email, "password": password}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let body = json_body(res).await;
    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());

    let res = send(
        &app,
        Request::get("/api/auth/me").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let me = json_body(res).await;
    assert_eq!(me["data"]["email"], json!(email));
    Ok(())
}

#[tokio::test]
async fn admin_role_cannot_be_self_registered() -> anyhow::Result<()> {
    let Some(app) = build_app().await? else { return Ok(()) };
    let email = format!("root_{}@example.com", Uuid::new_v4());
    let res = send(
        &app,
        post_json("/api/auth/register", json!({"email": email, "name": "Root", "password": "S3curePass!", "role": "admin"})),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn deactivation_revokes_existing_sessions() -> anyhow::Result<()> {
    let Some((app, db)) = build_app_with_db().await? else { return Ok(()) };
    let email = format!("off_{}@example.com", Uuid::new_v4());
    let password = "S3curePass!";

    let res = send(&app, post_json("/api/auth/register", json!({"email": email, "name": "Soon Off", "password": password}))).await;
    let user_id: Uuid = json_body(res).await["data"]["id"].as_str().unwrap_or_default().parse()?;
    let res = send(&app, post_json("/api/auth/login", json!({"email": email, "password": password}))).await;
    let token = json_body(res).await["data"]["token"].as_str().unwrap_or_default().to_string();

    let notifications = || {
        Request::get("/api/notifications/unread-count")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };
    assert_eq!(send(&app, notifications()).await.status(), StatusCode::OK);

    service::users::set_active(&db, Uuid::new_v4(), user_id, false).await?;
    assert_eq!(send(&app, notifications()).await.status(), StatusCode::UNAUTHORIZED);

    models::user::hard_delete(&db, user_id).await?;
    Ok(())
}
