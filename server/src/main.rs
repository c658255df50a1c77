//! HTTP front for the token engine.
//!
//! `/sessions` trusts the `profile_id` it is given and issues a token for it,
//! which also supersedes that identity's live token. It must only be reachable
//! by the authentication handshake layer; the default bind address is loopback.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sessionchain_core::{Hid, RawIdentity, TokenEngine};
use tracing_subscriber::EnvFilter;

mod config;

use config::ServerConfig;

type SharedEngine = Arc<TokenEngine>;

/// Identity vouched for by the authentication handshake running in front of
/// this service.
#[derive(Deserialize)]
struct SessionRequest {
    profile_id: String,
}

#[derive(Deserialize)]
struct TokenRequest {
    token: String,
}

#[derive(Serialize)]
struct IssuedToken {
    hid: Hid,
    token: String,
}

#[derive(Serialize)]
struct Verdict {
    valid: bool,
    hid: Option<Hid>,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

async fn open_session(
    State(engine): State<SharedEngine>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<IssuedToken>, (StatusCode, Json<Value>)> {
    let raw: RawIdentity = req
        .profile_id
        .parse()
        .map_err(|_| error(StatusCode::BAD_REQUEST, "profile_id must be 32 hex digits"))?;
    let hid = engine.hid_for(&raw);
    let token = engine.generate_token(&hid);
    Ok(Json(IssuedToken { hid, token }))
}

async fn verify(State(engine): State<SharedEngine>, Json(req): Json<TokenRequest>) -> Json<Verdict> {
    let hid = engine.get_hid_if_valid(&req.token);
    Json(Verdict { valid: hid.is_some(), hid })
}

async fn refresh(
    State(engine): State<SharedEngine>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<IssuedToken>, (StatusCode, Json<Value>)> {
    let hid = engine
        .get_hid_if_valid(&req.token)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "invalid token"))?;
    let token = engine.generate_token(&hid);
    Ok(Json(IssuedToken { hid, token }))
}

async fn health(State(engine): State<SharedEngine>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "chains": engine.store().len(),
        "version": sessionchain_core::version(),
    }))
}

fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/sessions", post(open_session))
        .route("/tokens/verify", post(verify))
        .route("/tokens/refresh", post(refresh))
        .route("/health", get(health))
        .with_state(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::from_env()?;
    let engine = TokenEngine::from_config(&cfg.engine).context("building token engine")?;
    tracing::info!(
        expiration = %cfg.engine.expiration,
        algorithm = %cfg.engine.algorithm,
        "token engine ready"
    );

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!(addr = %cfg.bind, "sessionchain-server listening");
    axum::serve(listener, router(Arc::new(engine))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sessionchain_core::ExpirationPolicy;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        router(Arc::new(TokenEngine::new("k", 0, ExpirationPolicy::FOREVER).unwrap()))
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn session_verify_refresh() {
        let app = app();
        let (status, issued) =
            post_json(&app, "/sessions", json!({ "profile_id": "853c80ef3c3749fdaa49938b674adae6" })).await;
        assert_eq!(status, StatusCode::OK);
        let token = issued["token"].as_str().unwrap().to_string();

        let (_, verdict) = post_json(&app, "/tokens/verify", json!({ "token": token })).await;
        assert_eq!(verdict["valid"], true);
        assert_eq!(verdict["hid"], issued["hid"]);

        let (status, refreshed) = post_json(&app, "/tokens/refresh", json!({ "token": token })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refreshed["hid"], issued["hid"]);
        assert_ne!(refreshed["token"], issued["token"]);

        let (_, verdict) = post_json(&app, "/tokens/verify", json!({ "token": refreshed["token"] })).await;
        assert_eq!(verdict["valid"], true);
    }

    #[tokio::test]
    async fn rejects_bad_identity_and_token() {
        let app = app();
        let (status, body) = post_json(&app, "/sessions", json!({ "profile_id": "not-a-uuid" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = post_json(&app, "/tokens/refresh", json!({ "token": "x.y" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, verdict) = post_json(&app, "/tokens/verify", json!({ "token": "x.y" })).await;
        assert_eq!(verdict, json!({ "valid": false, "hid": null }));
    }
}
