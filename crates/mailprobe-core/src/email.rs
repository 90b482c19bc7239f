//! Email API route group and the mailer collaborator it delegates to.
//!
//! Routes (relative to the mount prefix):
//! - `GET  /test` - liveness check
//! - `POST /send-candidate-session` - send a candidate session email
//!
//! Any other method on these paths yields 405 from the method router.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::MailerError;
use crate::routes::{HttpMethod, RouteGroup};

pub const TEST_PATH: &str = "/test";
pub const SEND_CANDIDATE_SESSION_PATH: &str = "/send-candidate-session";

/// Body of `POST /send-candidate-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCandidateSession {
    pub candidate_id: String,
    #[serde(default)]
    pub recruiter_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What the mailer reports back for an accepted email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub candidate_id: String,
    pub recipient: String,
    pub sent_at: DateTime<Utc>,
}

/// Sends candidate session emails on behalf of the email API.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_candidate_session(
        &self,
        request: &SendCandidateSession,
    ) -> Result<DeliveryReceipt, MailerError>;
}

/// In-process mailer standing in for the external email provider.
///
/// Nothing leaves the process: accepted emails are logged and kept in
/// memory. With a non-empty candidate allow-list, unknown candidates are
/// rejected with [`MailerError::CandidateNotFound`].
#[derive(Debug)]
pub struct LocalMailer {
    known_candidates: BTreeSet<String>,
    default_recipient: String,
    sent: Mutex<Vec<DeliveryReceipt>>,
}

impl Default for LocalMailer {
    fn default() -> Self {
        Self {
            known_candidates: BTreeSet::new(),
            default_recipient: "recruiter@localhost".to_string(),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl LocalMailer {
    pub fn with_known_candidates<I, C>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.known_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.default_recipient = recipient.into();
        self
    }

    /// Emails accepted so far, oldest first.
    pub fn sent(&self) -> Vec<DeliveryReceipt> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    async fn send_candidate_session(
        &self,
        request: &SendCandidateSession,
    ) -> Result<DeliveryReceipt, MailerError> {
        if !self.known_candidates.is_empty() && !self.known_candidates.contains(&request.candidate_id)
        {
            return Err(MailerError::CandidateNotFound {
                candidate_id: request.candidate_id.clone(),
            });
        }

        let receipt = DeliveryReceipt {
            message_id: uuid::Uuid::new_v4().to_string(),
            candidate_id: request.candidate_id.clone(),
            recipient: request
                .recruiter_email
                .clone()
                .unwrap_or_else(|| self.default_recipient.clone()),
            sent_at: Utc::now(),
        };

        info!(
            candidate_id = %receipt.candidate_id,
            recipient = %receipt.recipient,
            message_id = %receipt.message_id,
            has_message = request.message.is_some(),
            "candidate session email accepted"
        );

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(receipt.clone());
        Ok(receipt)
    }
}

/// Build the email API route group backed by `mailer`.
pub fn email_routes(mailer: Arc<dyn Mailer>) -> RouteGroup {
    RouteGroup::<Arc<dyn Mailer>>::new()
        .route(HttpMethod::Get, TEST_PATH, liveness)
        .route(
            HttpMethod::Post,
            SEND_CANDIDATE_SESSION_PATH,
            send_candidate_session,
        )
        .with_state(mailer)
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "email routes are live",
    }))
}

async fn send_candidate_session(
    State(mailer): State<Arc<dyn Mailer>>,
    payload: Result<Json<SendCandidateSession>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected send-candidate-session body");
            return failure(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    if let Err(e) = validate(&request) {
        return failure(StatusCode::BAD_REQUEST, e.to_string());
    }

    match mailer.send_candidate_session(&request).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "candidateId": receipt.candidate_id,
                "recipient": receipt.recipient,
                "messageId": receipt.message_id,
                "sentAt": receipt.sent_at,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(candidate_id = %request.candidate_id, error = %e, "candidate session email failed");
            let status = match e {
                MailerError::CandidateNotFound { .. } => StatusCode::NOT_FOUND,
                MailerError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                MailerError::Delivery { .. } => StatusCode::BAD_GATEWAY,
            };
            failure(status, e.to_string())
        }
    }
}

fn validate(request: &SendCandidateSession) -> Result<(), MailerError> {
    if request.candidate_id.trim().is_empty() {
        return Err(MailerError::InvalidRequest {
            message: "candidateId must not be blank".to_string(),
        });
    }
    if let Some(email) = &request.recruiter_email {
        if !email.contains('@') {
            return Err(MailerError::InvalidRequest {
                message: format!("recruiterEmail is not an email address: {email}"),
            });
        }
    }
    Ok(())
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": error.into(),
        })),
    )
        .into_response()
}
