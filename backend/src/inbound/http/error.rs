//! Domain errors rendered as JSON responses.
//!
//! Handlers return [`ApiResult`]; this module decides the status line, echoes
//! the trace id and keeps internal failure messages away from shoppers.
//! Body and query extraction failures are routed through the same payload via
//! [`json_config`] and [`query_config`].

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub use crate::domain::ApiResult;

const REDACTED_MESSAGE: &str = "Internal server error";

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The payload a client is allowed to see.
///
/// Internal errors keep only their trace id; unavailable collaborators keep
/// their message but lose adapter details.
fn client_view(error: &Error) -> Error {
    let view = match error.code() {
        ErrorCode::InternalError => Error::internal(REDACTED_MESSAGE),
        ErrorCode::ServiceUnavailable => Error::service_unavailable(error.message()),
        _ => return error.clone(),
    };
    match error.trace_id() {
        Some(id) => view.with_trace_id(id.to_owned()),
        None => view,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let trace_id = self.trace_id().unwrap_or_default();
        match self.code() {
            ErrorCode::InternalError => {
                error!(trace_id, message = self.message(), "request failed");
            }
            ErrorCode::ServiceUnavailable => {
                warn!(trace_id, message = self.message(), "collaborator unavailable");
            }
            _ => {}
        }

        let mut builder = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(client_view(self))
    }
}

fn extraction_error(kind: &str, detail: String) -> actix_web::Error {
    Error::invalid_request(format!("invalid {kind}: {detail}"))
        .with_details(json!({ "code": format!("invalid_{kind}") }))
        .into()
}

/// JSON body extractor settings that answer malformed bodies with an
/// `invalid_request` payload.
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        extraction_error("body", err.to_string())
    })
}

/// Query-string extractor settings matching [`json_config`].
#[must_use]
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        extraction_error("query", err.to_string())
    })
}

#[cfg(test)]
mod tests;
