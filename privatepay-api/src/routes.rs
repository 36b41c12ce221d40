//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Keys and stealth operations
        .route("/api/v1/keys/generate", post(handlers::generate_keys))
        .route("/api/v1/stealth/create", post(handlers::create_stealth))
        .route("/api/v1/stealth/scan", post(handlers::scan_payments))
        .route("/api/v1/stealth/recover", post(handlers::recover_key))

        // Announcements
        .route(
            "/api/v1/announcements",
            get(handlers::list_announcements).post(handlers::publish_announcement),
        )
        .route("/api/v1/announcements/stats", get(handlers::get_registry_stats))

        // Meta-addresses and aliases
        .route("/api/v1/meta-addresses", post(handlers::register_meta_address))
        .route("/api/v1/meta-addresses/:owner", get(handlers::list_meta_addresses))
        .route("/api/v1/meta-addresses/:owner/:index", get(handlers::get_meta_address))
        .route("/api/v1/aliases", post(handlers::register_alias))
        .route("/api/v1/aliases/:alias", get(handlers::resolve_alias))

        // Payment links
        .route("/api/v1/links", post(handlers::create_link))
        .route("/api/v1/links/parse", post(handlers::parse_link))

        // Transactions
        .route("/api/v1/transactions", post(handlers::record_transaction))
        .route(
            "/api/v1/transactions/:tx_hash/confirm",
            post(handlers::confirm_transaction),
        )
        .route(
            "/api/v1/transactions/address/:address",
            get(handlers::list_transactions),
        )

        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ApiConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    fn test_app() -> Router {
        let state = Arc::new(AppState::new(ApiConfig::default()));
        create_router(state)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn lower(value: &Value) -> String {
        value.as_str().unwrap().to_lowercase()
    }

    /// Generates keys and registers them under `WALLET` and the alias `alice`.
    async fn onboard(app: &Router) -> Value {
        let (status, keys) = call(app, "POST", "/api/v1/keys/generate", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, registered) = call(
            app,
            "POST",
            "/api/v1/meta-addresses",
            Some(json!({ "owner": WALLET, "meta_address": keys["meta_address"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(registered["index"], 0);

        let (status, alias) = call(
            app,
            "POST",
            "/api/v1/aliases",
            Some(json!({ "alias": "Alice", "wallet": WALLET })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(alias["alias"], "alice");
        assert_eq!(alias["meta_address"]["meta_address"], keys["meta_address"]);

        keys
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();
        let (status, body) = call(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["chain_id"], 5003);
        assert_eq!(body["network"], "mantle-sepolia");
    }

    #[tokio::test]
    async fn test_generate_keys() {
        let app = test_app();
        let (status, body) = call(&app, "POST", "/api/v1/keys/generate", None).await;

        assert_eq!(status, StatusCode::OK);
        let meta = body["meta_address"].as_str().unwrap();
        assert!(meta.starts_with("0x01"));
        assert_eq!(meta.len(), 2 + 67 * 2);
        assert_ne!(body["spend_public_key"], body["viewing_public_key"]);
    }

    #[tokio::test]
    async fn test_pay_scan_recover_flow() {
        let app = test_app();
        let keys = onboard(&app).await;

        let (status, created) = call(
            &app,
            "POST",
            "/api/v1/stealth/create",
            Some(json!({ "alias": "alice", "amount": "1.5" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["announcement"]["amount"], "1500000000000000000");
        assert_eq!(lower(&created["announcement"]["recipient"]), WALLET);

        let (status, published) = call(
            &app,
            "POST",
            "/api/v1/announcements",
            Some(created["announcement"].clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(published["id"], 1);

        let (status, scan) = call(
            &app,
            "POST",
            "/api/v1/stealth/scan",
            Some(json!({
                "viewing_secret_key": keys["viewing_secret_key"],
                "spend_public_key": keys["spend_public_key"],
                "spend_secret_key": keys["spend_secret_key"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scan["stats"]["total_scanned"], 1);
        assert_eq!(scan["stats"]["matches"], 1);
        let payment = &scan["payments"][0];
        assert_eq!(payment["stealth_address"], created["stealth_address"]);
        assert!(payment["stealth_private_key"].is_string());

        let (status, recovered) = call(
            &app,
            "POST",
            "/api/v1/stealth/recover",
            Some(json!({
                "spend_secret_key": keys["spend_secret_key"],
                "viewing_secret_key": keys["viewing_secret_key"],
                "ephemeral_public_key": created["ephemeral_public_key"],
                "k": created["k"],
                "stealth_address": created["stealth_address"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(recovered["verified"], true);
        assert_eq!(recovered["stealth_private_key"], payment["stealth_private_key"]);
    }

    #[tokio::test]
    async fn test_scan_with_repeated_view_hints() {
        let app = test_app();
        let keys = onboard(&app).await;
        let (_, created) = call(
            &app,
            "POST",
            "/api/v1/stealth/create",
            Some(json!({ "alias": "alice" })),
        )
        .await;
        call(&app, "POST", "/api/v1/announcements", Some(created["announcement"].clone())).await;

        let hint = created["announcement"]["view_hint"].as_u64().unwrap();
        let (status, scan) = call(
            &app,
            "POST",
            "/api/v1/stealth/scan",
            Some(json!({
                "viewing_secret_key": keys["viewing_secret_key"],
                "spend_public_key": keys["spend_public_key"],
                "view_hints": [hint, hint, hint],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scan["stats"]["total_scanned"], 1);
        assert_eq!(scan["payments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_with_other_keys_finds_nothing() {
        let app = test_app();
        onboard(&app).await;

        let (_, created) = call(
            &app,
            "POST",
            "/api/v1/stealth/create",
            Some(json!({ "recipient": WALLET, "index": 0 })),
        )
        .await;
        call(&app, "POST", "/api/v1/announcements", Some(created["announcement"].clone())).await;

        let (_, stranger) = call(&app, "POST", "/api/v1/keys/generate", None).await;
        let (status, scan) = call(
            &app,
            "POST",
            "/api/v1/stealth/scan",
            Some(json!({
                "viewing_secret_key": stranger["viewing_secret_key"],
                "spend_public_key": stranger["spend_public_key"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scan["stats"]["total_scanned"], 1);
        assert_eq!(scan["payments"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_recover_with_wrong_address_is_rejected() {
        let app = test_app();
        let keys = onboard(&app).await;
        let (_, created) = call(
            &app,
            "POST",
            "/api/v1/stealth/create",
            Some(json!({ "alias": "alice" })),
        )
        .await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/stealth/recover",
            Some(json!({
                "spend_secret_key": keys["spend_secret_key"],
                "viewing_secret_key": keys["viewing_secret_key"],
                "ephemeral_public_key": created["ephemeral_public_key"],
                "k": 7,
                "stealth_address": created["stealth_address"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "KEY_MISMATCH");
    }

    #[tokio::test]
    async fn test_announcement_listing_and_stats() {
        let app = test_app();
        onboard(&app).await;

        for _ in 0..3 {
            let (_, created) = call(
                &app,
                "POST",
                "/api/v1/stealth/create",
                Some(json!({ "alias": "alice", "amount": "0.1" })),
            )
            .await;
            call(
                &app,
                "POST",
                "/api/v1/announcements",
                Some(created["announcement"].clone()),
            )
            .await;
        }

        let uri = format!("/api/v1/announcements?recipient={}&limit=2", WALLET);
        let (status, list) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 3);
        assert_eq!(list["announcements"].as_array().unwrap().len(), 2);

        let (status, stats) = call(&app, "GET", "/api/v1/announcements/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_announcements"], 3);
        assert_eq!(stats["total_amount"], "300000000000000000");
    }

    #[tokio::test]
    async fn test_meta_address_lookup() {
        let app = test_app();
        let keys = onboard(&app).await;

        let uri = format!("/api/v1/meta-addresses/{}", WALLET);
        let (status, list) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["count"], 1);

        let (status, entry) =
            call(&app, "GET", &format!("/api/v1/meta-addresses/{}/0", WALLET), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entry["meta_address"], keys["meta_address"]);

        let (status, body) =
            call(&app, "GET", &format!("/api/v1/meta-addresses/{}/5", WALLET), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = call(&app, "GET", "/api/v1/meta-addresses/0x1234", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_alias_errors() {
        let app = test_app();
        onboard(&app).await;

        let (status, body) = call(&app, "GET", "/api/v1/aliases/bob", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/aliases",
            Some(json!({
                "alias": "alice",
                "wallet": "0x2222222222222222222222222222222222222222",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/aliases",
            Some(json!({ "alias": "not valid!", "wallet": WALLET })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payment_links() {
        let app = test_app();
        onboard(&app).await;

        let (status, created) = call(
            &app,
            "POST",
            "/api/v1/links",
            Some(json!({ "alias": "alice", "amount": "2", "message": "rent" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["link"]["url"], "https://privatepay.me/alice");
        assert_eq!(created["link"]["chain_id"], 5003);
        let uri = created["uri"].as_str().unwrap();
        assert!(uri.starts_with("ethereum:"));
        assert!(uri.contains("value=2000000000000000000"));

        let (status, parsed) = call(
            &app,
            "POST",
            "/api/v1/links/parse",
            Some(json!({ "link": "https://privatepay.me/alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parsed["parsed"]["type"], "link");
        assert_eq!(lower(&parsed["recipient"]["wallet"]), WALLET);

        let (status, parsed) = call(
            &app,
            "POST",
            "/api/v1/links/parse",
            Some(json!({ "link": uri })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parsed["parsed"]["type"], "uri");
        assert!(parsed["recipient"].is_null());

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/links",
            Some(json!({ "alias": "nobody" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transaction_lifecycle() {
        let app = test_app();
        let tx_hash = format!("0x{}", "ab".repeat(32));
        let stealth = "0x3333333333333333333333333333333333333333";

        let (status, record) = call(
            &app,
            "POST",
            "/api/v1/transactions",
            Some(json!({
                "tx_type": "payment",
                "sender": "0x2222222222222222222222222222222222222222",
                "recipient": WALLET,
                "stealth_address": stealth,
                "amount": "1000",
                "tx_hash": tx_hash,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "pending");

        let (status, confirmed) = call(
            &app,
            "POST",
            &format!("/api/v1/transactions/{}/confirm", tx_hash),
            Some(json!({ "block_number": 42 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["status"], "confirmed");
        assert_eq!(confirmed["block_number"], 42);

        let (status, list) = call(
            &app,
            "GET",
            &format!("/api/v1/transactions/address/{}", stealth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["transactions"].as_array().unwrap().len(), 1);

        let unknown = format!("0x{}", "cd".repeat(32));
        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/v1/transactions/{}/confirm", unknown),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_format() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/stealth/scan")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_create_requires_recipient() {
        let app = test_app();
        let (status, body) = call(&app, "POST", "/api/v1/stealth/create", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}
