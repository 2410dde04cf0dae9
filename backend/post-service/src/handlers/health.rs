/// Health endpoints, unauthenticated
use crate::db::StoreHealth;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub struct HealthState {
    store: Arc<dyn StoreHealth>,
}

impl HealthState {
    pub fn new(store: Arc<dyn StoreHealth>) -> Self {
        Self { store }
    }
}

#[derive(Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    backend: &'static str,
    message: String,
    latency_ms: u64,
    timestamp: String,
}

pub async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.store.health_check().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "post-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("{} check failed: {}", state.store.backend(), e),
            "service": "post-service"
        })),
    }
}

pub async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let start = Instant::now();
    let result = state.store.health_check().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (ready, status, message) = match result {
        Ok(_) => (true, ComponentStatus::Healthy, "store reachable".to_string()),
        Err(e) => (false, ComponentStatus::Unhealthy, format!("store check failed: {}", e)),
    };

    let response = ReadinessResponse {
        ready,
        status,
        backend: state.store.backend(),
        message,
        latency_ms,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
