//! The request authenticity pipeline end to end: timestamp window, nonce
//! single-use, canonical-string HMAC, body replay.

mod support;

use std::sync::Arc;

use actix_web::{test, web, App, HttpMessage, HttpRequest, HttpResponse};
use gateway_crypto_core::canonical_string;

use server::error::ApiError;
use server::middleware::{HmacAuth, MerchantContext};
use server::models::MerchantStatus;
use server::ports::{KvStore, MerchantDirectory};
use support::{make_merchant, sealer, FailingKvStore, MemKvStore, MemMerchantDirectory};

const SECRET: &str = "merchant-secret-key";
const PATH: &str = "/api/v1/payments";

/// Echo handler: proves the gate ran and the body survived the read-once.
async fn echo(req: HttpRequest, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let ctx = req
        .extensions()
        .get::<MerchantContext>()
        .cloned()
        .ok_or(ApiError::InvalidToken)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "merchant_id": ctx.merchant_id.to_string(),
        "body": String::from_utf8_lossy(&body),
    })))
}

struct Gate {
    directory: Arc<MemMerchantDirectory>,
    kv: Arc<dyn KvStore>,
    access_key: String,
}

fn active_gate() -> Gate {
    gate_with(MerchantStatus::Active, Arc::new(MemKvStore::new()))
}

fn gate_with(status: MerchantStatus, kv: Arc<dyn KvStore>) -> Gate {
    let directory = Arc::new(MemMerchantDirectory::new());
    let merchant = make_merchant(&sealer(), SECRET, status);
    let access_key = merchant.access_key.clone();
    directory.add_merchant(merchant);
    Gate {
        directory,
        kv,
        access_key,
    }
}

macro_rules! gate_app {
    ($gate:expr) => {
        test::init_service(
            App::new().service(
                web::scope("/api/v1/payments")
                    .wrap(HmacAuth::new(
                        Arc::clone(&$gate.directory) as Arc<dyn MerchantDirectory>,
                        Arc::clone(&$gate.kv),
                        sealer(),
                    ))
                    .route("", web::post().to(echo)),
            ),
        )
        .await
    };
}

fn signed_request(
    gate: &Gate,
    timestamp: i64,
    nonce: &str,
    body: &str,
) -> test::TestRequest {
    let canonical = canonical_string("POST", PATH, timestamp, nonce, body);
    let signature = gateway_crypto_core::sign(SECRET, &canonical);

    test::TestRequest::post()
        .uri(PATH)
        .insert_header(("X-Merchant-Access-Key", gate.access_key.clone()))
        .insert_header(("X-Signature", signature))
        .insert_header(("X-Timestamp", timestamp.to_string()))
        .insert_header(("X-Nonce", nonce.to_string()))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[actix_web::test]
async fn valid_signature_passes_and_body_is_replayed() {
    let gate = active_gate();
    let app = gate_app!(gate);

    let body = r#"{"amount":50000}"#;
    let resp = test::call_service(&app, signed_request(&gate, now(), "nonce-1", body).to_request()).await;
    assert_eq!(resp.status(), 200);

    let parsed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(parsed["body"], body);
}

#[actix_web::test]
async fn missing_headers_fail_as_invalid_access_key() {
    let gate = active_gate();
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri(PATH).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);

    let parsed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(parsed["error_code"], "SEC_001");
}

#[actix_web::test]
async fn stale_timestamp_is_rejected() {
    let gate = active_gate();
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        signed_request(&gate, now() - 120, "nonce-1", "{}").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);

    let parsed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(parsed["error_code"], "SEC_003");
}

#[actix_web::test]
async fn unknown_access_key_is_rejected() {
    let gate = active_gate();
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-1", "{}")
            .insert_header(("X-Merchant-Access-Key", "ak_nobody"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn suspended_merchant_is_rejected() {
    let gate = gate_with(MerchantStatus::Suspended, Arc::new(MemKvStore::new()));
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-1", "{}").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);

    let parsed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(parsed["error_code"], "AUTH_004");
}

#[actix_web::test]
async fn nonce_replay_is_rejected() {
    let gate = active_gate();
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-reuse", "{}").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    // Same (timestamp, nonce) again within the TTL window.
    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-reuse", "{}").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);

    let parsed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(parsed["error_code"], "SEC_004");
}

#[actix_web::test]
async fn tampered_body_fails_signature_check() {
    let gate = active_gate();
    let app = gate_app!(gate);

    // Signed over one body, sent with another.
    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-1", r#"{"amount":50000}"#)
            .set_payload(r#"{"amount":99999}"#.to_string())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);

    let parsed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(parsed["error_code"], "SEC_002");
}

#[actix_web::test]
async fn garbage_signature_is_rejected() {
    let gate = active_gate();
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-1", "{}")
            .insert_header(("X-Signature", "deadbeef"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn nonce_store_outage_degrades_to_allow() {
    // A KV transport failure must not take payments down; the signature
    // check still gates the request.
    let gate = gate_with(MerchantStatus::Active, Arc::new(FailingKvStore));
    let app = gate_app!(gate);

    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-1", "{}").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    // But a bad signature still fails even in degraded mode.
    let resp = test::call_service(
        &app,
        signed_request(&gate, now(), "nonce-2", "{}")
            .insert_header(("X-Signature", "00".repeat(32)))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}
