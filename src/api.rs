//! Request/response mapping for the resolution endpoint.
//!
//! `200` carries the fact; failures carry `{"error": <kind>, "message": ...}`
//! with `400`, `502` or `500`.

use serde::Serialize;
use serde_json::{Value, json};

use crate::resolver::{ResolveError, TrackResolver};

/// Status code plus JSON body, ready for any HTTP-ish transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    fn from_error(err: &ResolveError) -> Self {
        let message = match err {
            // Internal details stay in the log
            ResolveError::Server(_) => "unexpected error while resolving link".to_string(),
            other => other.to_string(),
        };
        let mut body = json!({
            "error": err.kind(),
            "message": message,
        });
        if err.kind() == "UpstreamError" {
            body["status"] = json!(err.upstream_status());
        }
        Self {
            status: err.http_status(),
            body,
        }
    }
}

/// Handle one resolution request. `url` is the request's single parameter.
pub fn respond(url: Option<&str>, resolver: &TrackResolver) -> ApiResponse {
    let Some(url) = url else {
        return ApiResponse::from_error(&ResolveError::Input("missing url parameter".to_string()));
    };

    match resolver.resolve(url) {
        Ok(fact) => match serde_json::to_value(&fact) {
            Ok(body) => ApiResponse { status: 200, body },
            Err(e) => {
                log::error!("Failed to serialize fact for {url}: {e}");
                ApiResponse::from_error(&ResolveError::Server(e.to_string()))
            }
        },
        Err(e) => ApiResponse::from_error(&e),
    }
}
