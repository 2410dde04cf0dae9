//! Prometheus metrics for post-service.
//!
//! Exposes saga outcome counters and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

/// Mutation outcomes by operation (`add_post`, `like_post`, ...) and outcome label
static MUTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "post_service_mutations_total",
        "Social graph mutations by operation and outcome",
        &["operation", "outcome"]
    )
    .expect("failed to register post_service_mutations_total")
});

/// Best-effort media deletions that failed and left an asset behind
static MEDIA_DESTROY_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "post_service_media_destroy_failures_total",
        "Media store deletions that failed during post deletion"
    )
    .expect("failed to register post_service_media_destroy_failures_total")
});

/// Dangling references repaired by the sweeper, by kind
static SWEEPER_REPAIRED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "post_service_sweeper_repaired_total",
        "Dangling references repaired by the reference sweeper",
        &["kind"]
    )
    .expect("failed to register post_service_sweeper_repaired_total")
});

pub fn record_mutation(operation: &str, outcome: &str) {
    MUTATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record the outcome of a saga from its result
pub fn record_result<T>(operation: &str, result: &crate::error::Result<T>) {
    use crate::error::AppError;

    let outcome = match result {
        Ok(_) => "success",
        Err(AppError::ValidationError(_)) => "invalid",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::Forbidden(_)) => "forbidden",
        Err(AppError::Conflict(_)) => "conflict",
        Err(AppError::Unauthorized(_)) => "unauthorized",
        Err(AppError::UploadError(_)) => "upload_error",
        Err(AppError::DatabaseError(_)) | Err(AppError::Internal(_)) => "error",
    };
    record_mutation(operation, outcome);
}

pub fn record_media_destroy_failure() {
    MEDIA_DESTROY_FAILURES.inc();
}

pub fn record_sweeper_repaired(kind: &str, count: u64) {
    SWEEPER_REPAIRED_TOTAL.with_label_values(&[kind]).inc_by(count);
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
