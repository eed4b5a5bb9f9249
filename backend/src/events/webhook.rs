//! HTTP webhook sink

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{EventSink, InventoryEvent};
use crate::error::{AppError, AppResult};

pub const SIGNATURE_HEADER: &str = "X-Inventory-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 of `body` under `secret`
pub fn sign_payload(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Configuration(format!("Invalid signing secret: {}", e)))?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// POSTs each event as JSON, signing the body when a secret is configured
pub struct HttpEventSink {
    endpoint: String,
    signing_secret: Option<String>,
    http_client: reqwest::Client,
}

impl HttpEventSink {
    pub fn new(endpoint: String, signing_secret: Option<String>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            signing_secret,
            http_client,
        })
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn deliver(&self, event: &InventoryEvent) -> Result<(), String> {
        let body = serde_json::to_vec(event).map_err(|e| format!("Failed to encode event: {}", e))?;

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");

        if let Some(secret) = &self.signing_secret {
            let signature = sign_payload(secret, &body).map_err(|e| e.to_string())?;
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Endpoint returned {}", response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_base64() {
        let a = sign_payload("secret", b"{\"a\":1}").unwrap();
        let b = sign_payload("secret", b"{\"a\":1}").unwrap();
        let c = sign_payload("other", b"{\"a\":1}").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        // 32-byte digest encodes to 44 base64 chars
        assert_eq!(a.len(), 44);
    }
}
