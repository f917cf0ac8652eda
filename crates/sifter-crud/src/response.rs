//! Response envelope.
//!
//! Every orchestrator operation returns a [`CrudResponse`]: an HTTP-style
//! status plus an optional JSON body. Turning it into an actual HTTP
//! response is the host framework's job.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::validate::FieldErrors;

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    NotFound,
    InternalServerError,
}

impl Status {
    /// The HTTP status code.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn is_success(self) -> bool {
        self.code() < 300
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// Paginated list body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBody<R> {
    /// Total matches, after filtering and before pagination.
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<R>,
}

/// Status and body of an orchestrator operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrudResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl CrudResponse {
    pub fn new(status: Status, body: Option<Value>) -> Self {
        CrudResponse { status, body }
    }

    /// 200 with a body.
    pub fn ok(body: Value) -> Self {
        Self::new(Status::Ok, Some(body))
    }

    /// 201 with the created record.
    pub fn created(body: Value) -> Self {
        Self::new(Status::Created, Some(body))
    }

    /// 204 without a body.
    pub fn no_content() -> Self {
        Self::new(Status::NoContent, None)
    }

    /// 404 `{"detail": "Not found."}`.
    pub fn not_found() -> Self {
        Self::new(Status::NotFound, Some(json!({"detail": "Not found."})))
    }

    /// 400 with the field errors as the body, unchanged.
    pub fn validation(errors: &FieldErrors) -> Self {
        let body = serde_json::to_value(errors).unwrap_or_else(|_| json!({}));
        Self::new(Status::BadRequest, Some(body))
    }

    /// 400 for a violated storage constraint.
    pub fn constraint(detail: impl Into<String>) -> Self {
        Self::new(
            Status::BadRequest,
            Some(json!({
                "error": "Database constraint violation",
                "detail": detail.into(),
            })),
        )
    }

    /// 401 `{"detail": ...}`, for hosts rejecting unauthenticated requests.
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(Status::Unauthorized, Some(json!({"detail": detail.into()})))
    }

    /// 500 with a short error description.
    pub fn internal(error: &str, detail: impl Into<String>) -> Self {
        Self::new(
            Status::InternalServerError,
            Some(json!({"error": error, "detail": detail.into()})),
        )
    }

    /// The status code.
    pub fn code(&self) -> u16 {
        self.status.code()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::Created.code(), 201);
        assert_eq!(Status::NoContent.code(), 204);
        assert_eq!(Status::BadRequest.code(), 400);
        assert_eq!(Status::Unauthorized.code(), 401);
        assert_eq!(Status::NotFound.code(), 404);
        assert_eq!(Status::InternalServerError.code(), 500);
        assert!(Status::NoContent.is_success());
        assert!(!Status::NotFound.is_success());
    }

    #[test]
    fn envelopes() {
        assert_eq!(
            CrudResponse::not_found().body,
            Some(json!({"detail": "Not found."}))
        );
        assert_eq!(
            CrudResponse::unauthorized("Invalid token.").body,
            Some(json!({"detail": "Invalid token."}))
        );
        assert_eq!(
            CrudResponse::constraint("UNIQUE constraint failed: item.name").body,
            Some(json!({
                "error": "Database constraint violation",
                "detail": "UNIQUE constraint failed: item.name"
            }))
        );
        let internal = CrudResponse::internal("Internal server error", "boom");
        assert_eq!(internal.code(), 500);
        assert_eq!(internal.body.unwrap()["error"], "Internal server error");
    }

    #[test]
    fn validation_body_is_verbatim() {
        let errors = FieldErrors::new().with("age", "A valid integer is required.");
        let response = CrudResponse::validation(&errors);
        assert_eq!(response.code(), 400);
        assert_eq!(
            response.body,
            Some(json!({"age": ["A valid integer is required."]}))
        );
    }

    #[test]
    fn serializes_status_as_code() {
        let value = serde_json::to_value(CrudResponse::no_content()).unwrap();
        assert_eq!(value, json!({"status": 204}));
    }

    #[test]
    fn page_body_shape() {
        let body = PageBody {
            count: 3,
            next: Some("http://h/?page=2".to_string()),
            previous: None,
            results: vec![1, 2],
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"count": 3, "next": "http://h/?page=2", "previous": null, "results": [1, 2]})
        );
    }
}
