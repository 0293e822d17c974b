use std::io::{Cursor, Read};
use std::time::Instant;

use lumen_core::{ErrorResponse, HealthResponse, ServiceError};
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::AppState;

pub const PROCESS_PATH: &str = "/api/processar-foto";
pub const HEALTH_PATH: &str = "/health";
pub const LIST_PATH: &str = "/api/fotos";
pub const PHOTO_PREFIX: &str = "/api/foto/";

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

// ---------------------------------------------------------------------------
// Response model
// ---------------------------------------------------------------------------

/// A response before it is bound to a `tiny_http` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<String>,
    pub preflight: bool,
    /// Redirect target, sent as `Location`.
    pub location: Option<String>,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                body: Some(body),
                preflight: false,
                location: None,
            },
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                let error = ServiceError::Internal(format!("failed to serialize response: {e}"));
                Self {
                    status: error.status_code(),
                    body: serde_json::to_string(&ErrorResponse::from(&error)).ok(),
                    preflight: false,
                    location: None,
                }
            }
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ErrorResponse::new(message))
    }

    fn from_service_error(error: &ServiceError) -> Self {
        Self::json(error.status_code(), &ErrorResponse::from(error))
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
            preflight: true,
            location: None,
        }
    }

    fn redirect<T: Serialize>(location: String, value: &T) -> Self {
        Self {
            location: Some(location),
            ..Self::json(302, value)
        }
    }

    fn busy(max_in_flight: usize) -> Self {
        Self::error(
            503,
            format!("Server busy: {max_in_flight} requests already in progress"),
        )
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    let header = Header::from_bytes(name.as_bytes(), value.as_bytes()).ok();
    if header.is_none() {
        tracing::warn!("Dropping invalid header {}: {:?}", name, value);
    }
    header
}

fn into_response(api: ApiResponse, cors_origin: &str) -> Response<Cursor<Vec<u8>>> {
    let mut headers: Vec<Header> = Vec::new();
    headers.extend(header("Access-Control-Allow-Origin", cors_origin));
    if api.preflight {
        headers.extend(header("Access-Control-Allow-Methods", ALLOWED_METHODS));
        headers.extend(header("Access-Control-Allow-Headers", ALLOWED_HEADERS));
        headers.extend(header("Access-Control-Max-Age", "86400"));
    }
    if let Some(location) = &api.location {
        headers.extend(header("Location", location));
    }

    let bytes = match api.body {
        Some(body) => {
            headers.extend(header("Content-Type", "application/json"));
            body.into_bytes()
        }
        None => Vec::new(),
    };
    let len = bytes.len();
    Response::new(StatusCode(api.status), headers, Cursor::new(bytes), Some(len), None)
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Read the request, route it and send the response.
pub fn dispatch(mut request: Request, state: &AppState) {
    let start = Instant::now();
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or_default().to_owned();

    let response = if method == Method::Post {
        match read_body(&mut request, state.max_body_bytes()) {
            Ok(body) => route(&method, &path, &body, state),
            Err(response) => response,
        }
    } else {
        route(&method, &path, &[], state)
    };

    let status = response.status;
    let elapsed = start.elapsed();
    if status >= 500 {
        tracing::error!("{} {} -> {} in {:?}", method, path, status, elapsed);
    } else if status >= 400 {
        tracing::warn!("{} {} -> {} in {:?}", method, path, status, elapsed);
    } else {
        tracing::info!("{} {} -> {} in {:?}", method, path, status, elapsed);
    }

    if let Err(e) = request.respond(into_response(response, &state.server.cors_allow_origin)) {
        tracing::debug!("Failed to send response for {} {}: {}", method, path, e);
    }
}

/// Answer 503 without reading the body.
pub fn reject_busy(request: Request, state: &AppState) {
    tracing::warn!("{} {} -> 503 (busy)", request.method(), request.url());
    let response = into_response(
        ApiResponse::busy(state.server.max_in_flight),
        &state.server.cors_allow_origin,
    );
    if let Err(e) = request.respond(response) {
        tracing::debug!("Failed to send busy response: {}", e);
    }
}

/// Read at most `limit` bytes of body; anything larger is a 413.
fn read_body(request: &mut Request, limit: u64) -> Result<Vec<u8>, ApiResponse> {
    let too_large = || {
        ApiResponse::error(
            413,
            format!("Request body too large (max {} MB)", limit / (1024 * 1024)),
        )
    };

    if request.body_length().is_some_and(|len| len as u64 > limit) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| ApiResponse::error(400, format!("Malformed request: failed to read body: {e}")))?;

    if body.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(body)
}

/// Map a method and path to a handler.
pub fn route(method: &Method, path: &str, body: &[u8], state: &AppState) -> ApiResponse {
    match (method, path) {
        (Method::Options, _) => ApiResponse::no_content(),
        (Method::Get, HEALTH_PATH) => ApiResponse::json(200, &HealthResponse::ok()),
        (Method::Post, PROCESS_PATH) => handle_process(body, state),
        (Method::Get, LIST_PATH) => handle_list(state),
        (Method::Get, _) if path.starts_with(PHOTO_PREFIX) => {
            handle_photo(&path[PHOTO_PREFIX.len()..], state)
        }
        _ => ApiResponse::error(404, format!("Not found: {method} {path}")),
    }
}

fn handle_list(state: &AppState) -> ApiResponse {
    match state.runtime.block_on(state.service.list_photos()) {
        Ok(listing) => ApiResponse::json(200, &listing),
        Err(e) => ApiResponse::from_service_error(&e),
    }
}

fn handle_photo(photo: &str, state: &AppState) -> ApiResponse {
    match state.runtime.block_on(state.service.photo_location(photo)) {
        Ok(location) => ApiResponse::redirect(location.url.clone(), &location),
        Err(e) => ApiResponse::from_service_error(&e),
    }
}

fn handle_process(body: &[u8], state: &AppState) -> ApiResponse {
    match state.runtime.block_on(state.service.handle_json(body)) {
        Ok(response) => ApiResponse::json(200, &response),
        Err(e) => {
            tracing::debug!("Request failed: {}", e);
            ApiResponse::from_service_error(&e)
        }
    }
}
