use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use chrono::Utc;
use models::coupon;
use models::enums::DiscountType;
use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::repository::mock::MockAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::pricing;

fn bench_login(c: &mut Criterion) {
    let repo = Arc::new(MockAuthRepository::default());
    let svc = AuthService::new(repo.clone(), AuthConfig::new("bench-secret-0123456789", 12));

    // pre-create user outside of the benchmark using a tokio runtime
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _ = rt.block_on(svc.register(RegisterInput { email: "bench@example.com".into(), name: "Bench".into(), password: "Benchmark1".into(), role: None }));

    c.bench_function("auth_login_issue_token", |b| {
        b.iter(|| {
            let _ = rt.block_on(svc.login(LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() })).unwrap();
        });
    });

    let session = rt.block_on(svc.login(LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() })).unwrap();
    c.bench_function("auth_verify_token", |b| {
        b.iter(|| svc.verify_token(black_box(&session.token)).unwrap());
    });
}

fn bench_pricing(c: &mut Criterion) {
    let now = Utc::now().into();
    let promo = coupon::Model {
        id: uuid::Uuid::new_v4(),
        code: "BEMVINDO15".into(),
        discount_type: DiscountType::Percent.as_str().into(),
        discount_value: 15,
        min_order_cents: Some(5_000),
        max_uses: Some(1_000),
        used_count: 10,
        expires_at: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    c.bench_function("pricing_apply_coupon_and_fee", |b| {
        b.iter(|| {
            let q = pricing::apply_coupon(&promo, black_box(18_990), now).unwrap();
            pricing::platform_fee(q.total_cents, black_box(10))
        });
    });
}

criterion_group!(benches, bench_login, bench_pricing);
criterion_main!(benches);
