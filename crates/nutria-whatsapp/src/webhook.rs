// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axum webhook receiver for the WhatsApp Cloud API.
//!
//! Routes:
//! - `GET /webhook` answers Meta's subscription handshake.
//! - `POST /webhook` accepts notifications, verifies `X-Hub-Signature-256`
//!   when an app secret is configured, and queues normalized messages.
//! - `GET /health` returns `ok`.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use hmac::{Hmac, Mac};
use nutria_core::{InboundMessage, NutriaError};
use serde::Deserialize;
use sha2::Sha256;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::payload::{WebhookPayload, normalize};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    pub verify_token: Option<String>,
    pub app_secret: Option<Arc<str>>,
}

/// Query parameters of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/health", get(health))
        .with_state(state)
}

/// Serves the webhook on an already bound listener until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: WebhookState,
    cancel: CancellationToken,
) -> Result<(), NutriaError> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "whatsapp webhook listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| NutriaError::Channel {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })
}

async fn verify(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let expected = match state.verify_token.as_deref() {
        Some(token) => token,
        None => {
            warn!("webhook verification attempted without a configured verify_token");
            return (StatusCode::FORBIDDEN, String::new());
        }
    };
    match (params.mode.as_deref(), params.verify_token.as_deref()) {
        (Some("subscribe"), Some(token)) if token == expected => {
            info!("webhook subscription verified");
            (StatusCode::OK, params.challenge.unwrap_or_default())
        }
        _ => {
            warn!("webhook verification rejected");
            (StatusCode::FORBIDDEN, String::new())
        }
    }
}

async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !signature.is_some_and(|sig| verify_signature(secret, &body, sig)) {
            warn!("rejecting webhook with missing or invalid signature");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    for msg in normalize(payload) {
        debug!(id = %msg.id, sender = %msg.sender, "queueing inbound message");
        if state.inbound_tx.send(msg).await.is_err() {
            warn!("inbound queue closed, dropping webhook message");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    // Meta retries anything that is not a 200.
    StatusCode::OK
}

async fn health() -> &'static str {
    "ok"
}

/// Checks a `sha256=<hex>` signature against the raw request body.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_sig) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
