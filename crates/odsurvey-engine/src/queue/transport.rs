use futures::future::LocalBoxFuture;
use odsurvey_core::WireChangeset;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of one interview update sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub interview_id: String,
    #[serde(default)]
    pub values_by_path: Map<String, Value>,
    #[serde(default)]
    pub unset_paths: Vec<String>,
}

impl UpdateRequest {
    pub fn new(interview_id: impl Into<String>, changes: WireChangeset) -> Self {
        Self {
            interview_id: interview_id.into(),
            values_by_path: changes.values_by_path,
            unset_paths: changes.unset_paths,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Success,
    /// Saved, but the backend reported validation messages.
    Invalid,
    /// The session is over; the client should leave for `redirect_url`.
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub status: UpdateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_id: Option<String>,
    /// Values the backend assigned; fold them in with `apply_server_update`.
    #[serde(default)]
    pub updated_values_by_path: Map<String, Value>,
    /// Server-side validation messages keyed by response path.
    #[serde(default)]
    pub messages: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl UpdateResponse {
    pub fn success(interview_id: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::Success,
            interview_id: Some(interview_id.into()),
            updated_values_by_path: Map::new(),
            messages: Map::new(),
            redirect_url: None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend answered with status {0}")]
    Status(u16),
    #[error("cannot decode backend response: {0}")]
    Decode(String),
    #[error("response for interview `{actual}` while updating `{expected}`")]
    InterviewMismatch { expected: String, actual: String },
    #[error("response without an interview id while updating `{expected}`")]
    MissingInterviewId { expected: String },
}

impl TransportError {
    /// Network failures and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Status(code) => *code >= 500,
            Self::Decode(_) | Self::InterviewMismatch { .. } | Self::MissingInterviewId { .. } => {
                false
            }
        }
    }
}

/// Sends one update to the persistence backend.
pub trait UpdateTransport {
    fn send<'a>(
        &'a self,
        request: &'a UpdateRequest,
    ) -> LocalBoxFuture<'a, Result<UpdateResponse, TransportError>>;
}
