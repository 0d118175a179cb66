//! Trial-gated intake operations: candidate applications and job postings.
//!
//! Both run the same shape: charge quota first (the tracker's atomic
//! check-then-increment is the at-most-once gate), then perform the remote
//! writes. The screening webhook fires after a successful candidate insert
//! and is fire-and-forget — its failure never rolls the insert back. If a
//! remote write fails after the charge, the optimistic counter is ahead of
//! the authoritative row count until the next reconciliation pass lowers it.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::quota::QuotaTracker;
use crate::reconcile::{CANDIDATES_TABLE, JOBS_TABLE, TENANT_COLUMN};
use crate::remote::{BlobStore, RowStore, ScreeningRequest, WorkflowClient};
use crate::session::SessionManager;
use crate::tenant::ActiveEndpoints;

/// A candidate's application form.
#[derive(Debug, Clone)]
pub struct CandidateApplication {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub job_id: String,
    pub job_title: String,
    pub resume: Option<ResumeUpload>,
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A recruiter's new job posting.
#[derive(Debug, Clone)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub department: Option<String>,
    pub salary: Option<String>,
}

/// Result of a gated intake operation.
#[derive(Debug)]
pub enum IntakeOutcome {
    /// The stored row, as returned by the row store.
    Accepted(Value),
    /// Trial quota rejected the action; nothing was written and the
    /// screening workflow was NOT called.
    QuotaExhausted,
}

pub struct IntakeService {
    rows: Arc<dyn RowStore>,
    blobs: Arc<dyn BlobStore>,
    workflow: WorkflowClient,
    quota: Arc<QuotaTracker>,
    sessions: Arc<SessionManager>,
    endpoints: ActiveEndpoints,
}

impl IntakeService {
    pub fn new(
        rows: Arc<dyn RowStore>,
        blobs: Arc<dyn BlobStore>,
        workflow: WorkflowClient,
        quota: Arc<QuotaTracker>,
        sessions: Arc<SessionManager>,
        endpoints: ActiveEndpoints,
    ) -> Self {
        Self {
            rows,
            blobs,
            workflow,
            quota,
            sessions,
            endpoints,
        }
    }

    /// Accept a candidate application: charge one scan, upload the resume,
    /// insert the candidate row, then dispatch the screening webhook.
    pub async fn submit_application(
        &self,
        application: CandidateApplication,
    ) -> anyhow::Result<IntakeOutcome> {
        if !self.quota.increment_scan_usage() {
            info!(job_id = %application.job_id, "application rejected: scan quota exhausted");
            return Ok(IntakeOutcome::QuotaExhausted);
        }

        let resume_url = match &application.resume {
            Some(upload) => Some(self.store_resume(&application.full_name, upload).await?),
            None => None,
        };

        let mut row = json!({
            "full_name": application.full_name,
            "email": application.email,
            "phone": application.phone,
            "linkedin": application.linkedin,
            "job_id": application.job_id,
            "resume_url": resume_url,
            "status": "new",
        });
        self.stamp_tenant(&mut row);

        let stored = self.rows.insert(CANDIDATES_TABLE, row).await?;
        info!(
            candidate_id = %stored["id"],
            job_id = %application.job_id,
            "candidate application stored"
        );

        // screening only runs when there is a resume to screen
        if let Some(resume_url) = resume_url {
            let request = ScreeningRequest {
                candidate_id: stored["id"].as_str().unwrap_or_default().to_string(),
                candidate_name: application.full_name,
                candidate_email: application.email,
                job_id: application.job_id,
                job_title: application.job_title,
                resume_url,
            };
            self.workflow
                .dispatch_screening(&self.endpoints.effective().workflow_url, request);
        }

        Ok(IntakeOutcome::Accepted(stored))
    }

    /// Create a job posting: charge one job slot, insert the row.
    pub async fn create_job_posting(&self, posting: JobPosting) -> anyhow::Result<IntakeOutcome> {
        if !self.quota.increment_job_usage() {
            info!(title = %posting.title, "job posting rejected: job quota exhausted");
            return Ok(IntakeOutcome::QuotaExhausted);
        }

        let mut row = json!({
            "title": posting.title,
            "description": posting.description,
            "requirements": posting.requirements,
            "location": posting.location,
            "department": posting.department,
            "salary": posting.salary,
            "status": "Active",
        });
        self.stamp_tenant(&mut row);

        let stored = self.rows.insert(JOBS_TABLE, row).await?;
        info!(job_id = %stored["id"], "job posting created");
        Ok(IntakeOutcome::Accepted(stored))
    }

    async fn store_resume(&self, candidate: &str, upload: &ResumeUpload) -> anyhow::Result<String> {
        let extension = upload
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("pdf");
        let path = format!(
            "resumes/{}-{}.{}",
            candidate.replace(char::is_whitespace, "-"),
            uuid::Uuid::new_v4(),
            extension
        );
        self.blobs.upload(&path, upload.bytes.clone()).await?;
        Ok(self.blobs.public_url(&path))
    }

    /// Attach the tenant id for scoped tables. Administrator sessions write
    /// unscoped, matching the platform-level view.
    fn stamp_tenant(&self, row: &mut Value) {
        let Some(session) = self.sessions.current() else {
            return;
        };
        if session.is_administrator() {
            return;
        }
        if let Some(obj) = row.as_object_mut() {
            obj.insert(TENANT_COLUMN.to_string(), Value::String(session.id));
        }
    }
}
