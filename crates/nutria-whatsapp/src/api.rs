// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal Graph API client: text sends and media downloads.

use std::time::Duration;

use nutria_core::NutriaError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    url: String,
}

pub struct GraphClient {
    http: Client,
    base_url: String,
    access_token: String,
    phone_number_id: String,
}

fn http_err(context: &str, e: reqwest::Error) -> NutriaError {
    NutriaError::Channel {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

impl GraphClient {
    pub fn new(
        base_url: &str,
        access_token: &str,
        phone_number_id: &str,
    ) -> Result<Self, NutriaError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| http_err("failed to build HTTP client", e))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            phone_number_id: phone_number_id.to_string(),
        })
    }

    /// Sends a text message, returning the platform message id.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<String, NutriaError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": { "preview_url": false, "body": body },
            }))
            .send()
            .await
            .map_err(|e| http_err("send request failed", e))?;
        let resp = check_status(resp, "send").await?;
        let parsed: SendResponse = resp
            .json()
            .await
            .map_err(|e| http_err("invalid send response", e))?;
        Ok(parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .unwrap_or_default())
    }

    /// Resolves a media id to its download URL, then fetches the bytes.
    pub async fn download_media(&self, media_id: &str) -> Result<Vec<u8>, NutriaError> {
        let info_url = format!("{}/{}", self.base_url, media_id);
        let resp = self
            .http
            .get(&info_url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| http_err("media lookup failed", e))?;
        let info: MediaInfo = check_status(resp, "media lookup")
            .await?
            .json()
            .await
            .map_err(|e| http_err("invalid media lookup response", e))?;

        let resp = self
            .http
            .get(&info.url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| http_err("media download failed", e))?;
        let bytes = check_status(resp, "media download")
            .await?
            .bytes()
            .await
            .map_err(|e| http_err("media download interrupted", e))?;
        Ok(bytes.to_vec())
    }
}

async fn check_status(
    resp: reqwest::Response,
    op: &str,
) -> Result<reqwest::Response, NutriaError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(NutriaError::channel(format!(
        "graph api {op} returned {status}: {body}"
    )))
}
