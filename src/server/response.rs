use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// The envelope every command endpoint answers with:
/// `{ status: OK | ERROR, message?, data? }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        CommandResponse { status: ResponseStatus::Ok, message: None, data: None }
    }

    pub fn ok_with(data: serde_json::Value) -> Self {
        CommandResponse { status: ResponseStatus::Ok, message: None, data: Some(data) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        CommandResponse {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

impl From<AppError> for CommandResponse {
    fn from(err: AppError) -> Self {
        match err {
            // Internal faults were already logged with detail at the point
            // of failure; only a generic message crosses the boundary.
            AppError::Internal(_) => CommandResponse::error("Internal error"),
            other => CommandResponse::error(other.to_string()),
        }
    }
}
