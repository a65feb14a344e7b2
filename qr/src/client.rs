use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::scanner::{
    AttendanceSummary, CheckInConfirmation, CheckInRejection, CheckInSubmitter, EntryMethod,
    RejectionKind,
};

/// Submits check-ins to `POST {api_base}/attendance/check-in` with a bearer token.
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct CheckInBody<'a> {
    qr_code: &'a str,
    timestamp: DateTime<Utc>,
    check_in_method: EntryMethod,
}

#[derive(Debug, Deserialize)]
struct CheckInReply {
    success: bool,
    message: String,
    #[serde(default)]
    already_checked_in: bool,
    #[serde(default)]
    attendance: Option<AttendanceSummary>,
    #[serde(default)]
    error: Option<RejectionKind>,
}

impl HttpSubmitter {
    pub fn new(api_base: &str, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_base, token)
    }

    pub fn with_client(client: reqwest::Client, api_base: &str, token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/attendance/check-in", api_base.trim_end_matches('/')),
            token: token.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Best guess at the rejection kind when the body does not say.
pub fn kind_for_status(status: StatusCode) -> RejectionKind {
    match status {
        StatusCode::BAD_REQUEST => RejectionKind::InvalidFormat,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RejectionKind::Unauthorized,
        StatusCode::NOT_FOUND => RejectionKind::CodeNotFound,
        StatusCode::GONE => RejectionKind::CodeExpiredOrInactive,
        StatusCode::UNPROCESSABLE_ENTITY => RejectionKind::ClassResolutionFailed,
        _ => RejectionKind::Transient,
    }
}

#[async_trait]
impl CheckInSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        code: &str,
        at: DateTime<Utc>,
        method: EntryMethod,
    ) -> Result<CheckInConfirmation, CheckInRejection> {
        let body = CheckInBody {
            qr_code: code,
            timestamp: at,
            check_in_method: method,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Check-in request failed");
                CheckInRejection::new(
                    RejectionKind::Transient,
                    "Could not reach the server. Please try again.",
                )
            })?;

        let status = response.status();
        match response.json::<CheckInReply>().await {
            Ok(reply) if status.is_success() && reply.success => Ok(CheckInConfirmation {
                message: reply.message,
                already_checked_in: reply.already_checked_in,
                attendance: reply.attendance,
            }),
            Ok(reply) => Err(CheckInRejection::new(
                reply.error.unwrap_or_else(|| kind_for_status(status)),
                reply.message,
            )),
            Err(e) => {
                tracing::warn!(%status, error = %e, "Unreadable check-in response");
                Err(CheckInRejection::new(
                    kind_for_status(status),
                    format!("Unexpected response from server ({status})"),
                ))
            }
        }
    }
}
