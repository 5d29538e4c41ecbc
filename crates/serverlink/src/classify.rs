//! Mapping raw probe responses onto canonical statuses.

use http::StatusCode;
use serverlink_core::Status;

/// An HTTP response as seen by the probing side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub code: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(code: u16, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }

    /// A `200 OK` response carrying `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK.as_u16(), body)
    }

    pub fn classify(&self) -> Status {
        classify(self.code, &self.body)
    }
}

/// What a well-behaved responder would send when advertising `status`.
impl From<Status> for RawResponse {
    fn from(status: Status) -> Self {
        Self::ok(status.as_str())
    }
}

/// Classify a response: the body names the status only on `200 OK`.
///
/// Anything else, including a `200` with an unrecognized or padded body,
/// is `Invalid`.
pub fn classify(code: u16, body: &str) -> Status {
    if code != StatusCode::OK.as_u16() {
        return Status::Invalid;
    }
    body.parse().unwrap_or(Status::Invalid)
}
