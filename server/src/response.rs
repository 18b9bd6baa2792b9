//! Standard response envelopes.
//!
//! Success: `{ data, request_id, timestamp }`. Errors use the envelope in
//! `error.rs`. The request id is carried in a task-local set by the
//! request-id middleware so both envelopes and log lines share one
//! correlator.

use actix_web::HttpResponse;
use serde::Serialize;
use uuid::Uuid;

tokio::task_local! {
    pub(crate) static REQUEST_ID: String;
}

/// The request id for the current task, or a fresh one when called outside
/// a request scope (startup, background tasks).
pub fn current_request_id() -> String {
    REQUEST_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| Uuid::new_v4().to_string())
}

#[derive(Serialize)]
struct SuccessBody<T: Serialize> {
    data: T,
    request_id: String,
    timestamp: String,
}

fn envelope<T: Serialize>(data: T) -> SuccessBody<T> {
    SuccessBody {
        data,
        request_id: current_request_id(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// 200 with the success envelope.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(envelope(data))
}

/// 201 with the success envelope.
pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(envelope(data))
}
