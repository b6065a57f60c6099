use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter, IntCounterVec, IntGauge, TextEncoder};

// Prometheus metrics (default registry)
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "myserv_http_requests_total",
        "Total HTTP requests handled"
    )
    .expect("register http_requests_total")
});

pub static BOOKINGS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "myserv_bookings_total",
        "Service request status changes",
        &["status"]
    )
    .expect("register bookings_total")
});

pub static PAYMENT_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "myserv_payment_events_total",
        "Payment status updates received from the gateway",
        &["status"]
    )
    .expect("register payment_events_total")
});

pub static CHAT_MESSAGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "myserv_chat_messages_total",
        "Support chat messages relayed"
    )
    .expect("register chat_messages_total")
});

pub static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "myserv_ws_connections",
        "Open support chat WebSocket connections"
    )
    .expect("register ws_connections")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        HTTP_REQUESTS_TOTAL.inc();
        BOOKINGS_TOTAL.with_label_values(&["pending"]).inc();
        let (status, body) = encode_metrics();
        assert_eq!(status, axum::http::StatusCode::OK);
        assert!(body.contains("myserv_http_requests_total"));
        assert!(body.contains("myserv_bookings_total"));
    }
}
