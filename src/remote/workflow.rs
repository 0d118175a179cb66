//! AI screening workflow webhook client.
//!
//! The workflow is an opaque external system: we POST a screening request
//! and it eventually mutates the candidate row out-of-band. Delivery is
//! fire-and-forget tolerant — a failed webhook never rolls back a prior
//! successful row insert.

use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use tracing::{info, warn};

// ── Screening Request ─────────────────────────────────────────

/// Payload sent to the screening workflow when a candidate applies.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningRequest {
    pub candidate_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_id: String,
    pub job_title: String,
    pub resume_url: String,
}

// ── HMAC Signing ─────────────────────────────────────────────

/// HMAC-SHA256 of `payload` using `secret`, as "sha256=<hex>".
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ── Workflow Client ───────────────────────────────────────────

/// Posts JSON payloads to a workflow endpoint, optionally signing the body
/// with a shared secret in the `x-hireforce-signature` header.
#[derive(Clone)]
pub struct WorkflowClient {
    client: reqwest::Client,
    signing_secret: Option<String>,
}

impl WorkflowClient {
    pub fn new(signing_secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("HireForce-Workflow/1.0")
                .build()
                .expect("failed to build workflow HTTP client"),
            signing_secret,
        }
    }

    /// POST a JSON payload and return the parsed JSON response. One
    /// attempt; callers in the data path decide whether failure matters.
    pub async fn post(&self, url: &str, payload: &Value) -> Result<Value> {
        let body = serde_json::to_vec(payload)?;
        let delivery_id = uuid::Uuid::new_v4().to_string();

        let mut request = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .header("x-hireforce-delivery-id", &delivery_id)
            .header(
                "x-hireforce-timestamp",
                chrono::Utc::now().timestamp().to_string(),
            );

        if let Some(secret) = &self.signing_secret {
            request = request.header("x-hireforce-signature", hmac_sha256_hex(secret, &body));
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("workflow returned {status}: {body}");
        }

        let parsed = response.json::<Value>().await.unwrap_or(Value::Null);
        info!(url, delivery_id = %delivery_id, status = %status, "workflow webhook delivered");
        Ok(parsed)
    }

    /// Fire-and-forget screening dispatch: spawned, retried twice with
    /// back-off, failures logged and swallowed.
    pub fn dispatch_screening(&self, url: &str, request: ScreeningRequest) {
        let client = self.clone();
        let url = url.to_string();

        tokio::spawn(async move {
            let payload = match serde_json::to_value(&request) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "screening request failed to serialize");
                    return;
                }
            };

            let backoff_secs: &[u64] = &[0, 1, 5];
            for &delay in backoff_secs {
                if delay > 0 {
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
                match client.post(&url, &payload).await {
                    Ok(_) => return,
                    Err(e) => {
                        warn!(
                            url,
                            candidate_id = %request.candidate_id,
                            error = %e,
                            "screening webhook attempt failed"
                        );
                    }
                }
            }
            warn!(
                url,
                candidate_id = %request.candidate_id,
                "screening webhook dropped after all retries; candidate row is kept"
            );
        });
    }
}

impl Default for WorkflowClient {
    fn default() -> Self {
        Self::new(None)
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn hmac_signature_is_deterministic_per_secret() {
        let sig1 = hmac_sha256_hex("secret123", b"payload");
        let sig2 = hmac_sha256_hex("secret123", b"payload");
        let sig3 = hmac_sha256_hex("other", b"payload");
        assert_eq!(sig1, sig2);
        assert_ne!(sig1, sig3);
        assert!(sig1.starts_with("sha256="));
    }

    #[test]
    fn screening_request_serializes_all_fields() {
        let request = ScreeningRequest {
            candidate_id: "c1".into(),
            candidate_name: "Ada".into(),
            candidate_email: "ada@x.com".into(),
            job_id: "j1".into(),
            job_title: "Engineer".into(),
            resume_url: "https://blobs.test/ada.pdf".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["candidate_id"], "c1");
        assert_eq!(json["job_title"], "Engineer");
        assert_eq!(json["resume_url"], "https://blobs.test/ada.pdf");
    }

    #[tokio::test]
    async fn post_returns_parsed_response_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/resume-screening"))
            .and(header_exists("x-hireforce-delivery-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queued": true})))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(None);
        let url = format!("{}/webhook/resume-screening", server.uri());
        let response = client.post(&url, &json!({"hello": "world"})).await.unwrap();
        assert_eq!(response["queued"], true);
    }

    #[tokio::test]
    async fn post_signs_body_when_secret_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("x-hireforce-signature"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WorkflowClient::new(Some("shared-secret".into()));
        client.post(&server.uri(), &json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn post_surfaces_non_2xx_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("workflow down"))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(None);
        let result = client.post(&server.uri(), &json!({})).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
    }
}
