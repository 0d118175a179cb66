use serde::Deserialize;

use crate::errors::CoreError;
use crate::models::IntegrationEndpoints;

/// Process-wide configuration: the shared default integration endpoints
/// substituted for tenants without their own, trial quota defaults, and
/// the seed administrator credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Fallback endpoint triple used when an identity carries none.
    pub shared_endpoints: IntegrationEndpoints,
    /// Default trial scan ceiling. Set via HIREFORCE_TRIAL_MAX_SCANS. Default: 5.
    pub default_max_scans: u32,
    /// Default trial job-posting ceiling. Set via HIREFORCE_TRIAL_MAX_JOBS. Default: 1.
    pub default_max_jobs: u32,
    pub admin_login: String,
    pub admin_secret: String,
    /// Optional shared secret for signing workflow webhook payloads.
    pub workflow_signing_secret: Option<String>,
}

const PLACEHOLDER_ADMIN_SECRET: &str = "CHANGE_ME_ADMIN_SECRET";

pub fn load() -> Result<Config, CoreError> {
    dotenvy::dotenv().ok();

    let admin_secret = std::env::var("HIREFORCE_ADMIN_SECRET")
        .unwrap_or_else(|_| PLACEHOLDER_ADMIN_SECRET.into());

    if admin_secret == PLACEHOLDER_ADMIN_SECRET {
        let env_mode = std::env::var("HIREFORCE_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            return Err(CoreError::Config(
                "HIREFORCE_ADMIN_SECRET is still the insecure placeholder. \
                 Set a real secret before running in production."
                    .into(),
            ));
        }
        tracing::warn!("HIREFORCE_ADMIN_SECRET is not set — using insecure placeholder");
    }

    let shared_endpoints = IntegrationEndpoints {
        workflow_url: std::env::var("HIREFORCE_WORKFLOW_URL")
            .unwrap_or_else(|_| "https://workflows.hireforce.dev/webhook/resume-screening".into()),
        data_store_url: std::env::var("HIREFORCE_DATA_STORE_URL")
            .unwrap_or_else(|_| "https://data.hireforce.dev".into()),
        data_store_key: std::env::var("HIREFORCE_DATA_STORE_KEY").unwrap_or_default(),
    };

    // Reject a malformed override early rather than at first webhook post.
    url::Url::parse(&shared_endpoints.workflow_url)?;
    url::Url::parse(&shared_endpoints.data_store_url)?;

    Ok(Config {
        shared_endpoints,
        default_max_scans: std::env::var("HIREFORCE_TRIAL_MAX_SCANS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5),
        default_max_jobs: std::env::var("HIREFORCE_TRIAL_MAX_JOBS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        admin_login: std::env::var("HIREFORCE_ADMIN_LOGIN")
            .unwrap_or_else(|_| "admin@hireforce.dev".into()),
        admin_secret,
        workflow_signing_secret: std::env::var("HIREFORCE_WORKFLOW_SIGNING_SECRET").ok(),
    })
}

#[cfg(test)]
impl Config {
    /// Fixed config for tests; avoids touching process env.
    pub fn for_tests() -> Self {
        Config {
            shared_endpoints: IntegrationEndpoints {
                workflow_url: "https://workflows.test/webhook/resume-screening".into(),
                data_store_url: "https://data.test".into(),
                data_store_key: "test-key".into(),
            },
            default_max_scans: 5,
            default_max_jobs: 1,
            admin_login: "admin@hireforce.dev".into(),
            admin_secret: "test-admin-secret".into(),
            workflow_signing_secret: None,
        }
    }
}
