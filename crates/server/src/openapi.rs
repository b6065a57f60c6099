use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    /// `client` (default) or `provider`.
    pub role: Option<String>,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct BookingRequest {
    pub service_id: Uuid,
    /// RFC 3339 timestamp in the future.
    pub scheduled_for: String,
    pub address: String,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(ToSchema)]
pub struct TransitionRequest {
    /// One of `accept`, `reject`, `start`, `complete`, `cancel`.
    pub action: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::providers::get_public,
        crate::routes::catalog::search,
        crate::routes::catalog::get_public,
        crate::routes::bookings::create,
        crate::routes::bookings::transition,
        crate::routes::payments::webhook,
        crate::routes::settings::public,
        crate::routes::locations::cep,
        crate::routes::locations::cities,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            BookingRequest,
            TransitionRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "catalog"),
        (name = "bookings"),
        (name = "payments"),
        (name = "settings"),
        (name = "locations")
    )
)]
pub struct ApiDoc;
