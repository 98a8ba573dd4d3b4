// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP adapter.
//!
//! Every request that is not a static file goes through a fallback handler
//! that converts it into a [`pagewright::Request`], runs the dispatcher on
//! the blocking pool and converts the [`PageResponse`] back.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use pagewright::{Application, PageResponse, FLASH_COOKIE};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;

const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Shared server state.
pub struct AppState {
    /// The assembled site.
    pub app: Application,
    /// Site configuration.
    pub config: Config,
}

/// Builds the axum router for a site.
pub fn router(state: Arc<AppState>) -> Router {
    let context_path = state.config.server.context_path.clone();
    let static_dir = state.config.static_dir();
    let cors = state.config.server.cors;

    let mut app = Router::new();
    if static_dir.is_dir() {
        app = app.nest_service(&format!("{}/static", context_path), ServeDir::new(static_dir));
    }
    let app = app.fallback(page_handler).with_state(state);

    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn page_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let context_path = state.config.server.context_path.as_str();

    let Some(path) = strip_context(parts.uri.path(), context_path) else {
        return error_page(StatusCode::NOT_FOUND, "Page not found");
    };

    let mut page_request = pagewright::Request::new(path, parts.method.as_str()).with_context_path(context_path);
    if let Some(query) = parts.uri.query() {
        page_request.add_urlencoded(query.as_bytes());
    }
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            page_request.headers.insert(name.as_str().to_string(), value.to_string());
        }
    }
    if let Some(cookies) = page_request.header("cookie").map(str::to_string) {
        page_request.cookies.extend(parse_cookies(&cookies));
    }

    if parts.method != Method::GET && parts.method != Method::HEAD && page_request.is_form_submission() {
        match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
            Ok(bytes) => page_request.add_urlencoded(&bytes),
            Err(_) => return error_page(StatusCode::PAYLOAD_TOO_LARGE, "Body too large"),
        }
    }

    let new_conversation = if page_request.cookies.contains_key(FLASH_COOKIE) {
        None
    } else {
        let key = conversation_key();
        page_request.cookies.insert(FLASH_COOKIE.to_string(), key.clone());
        Some(key)
    };

    let dispatched = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || state.app.dispatch(&page_request)).await
    };

    let mut response = match dispatched {
        Ok(Ok(Some(response))) => to_http(response),
        Ok(Ok(None)) => {
            debug!(path = %parts.uri.path(), "No page matched");
            error_page(StatusCode::NOT_FOUND, "Page not found")
        }
        Ok(Err(e)) => {
            warn!(path = %parts.uri.path(), error = %e, "Dispatch failed");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
        Err(e) => {
            warn!(path = %parts.uri.path(), error = %e, "Dispatch task failed");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };

    if let Some(key) = new_conversation {
        let path = if context_path.is_empty() { "/" } else { context_path };
        let cookie = format!("{}={}; Path={}; HttpOnly; SameSite=Lax", FLASH_COOKIE, key, path);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// The request path below the context path, or `None` outside it.
fn strip_context<'a>(path: &'a str, context_path: &str) -> Option<&'a str> {
    if context_path.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(context_path)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                None
            } else {
                Some((name.to_string(), value.trim().trim_matches('"').to_string()))
            }
        })
        .collect()
}

/// Unguessable key for a new flash conversation (random v4 UUID).
fn conversation_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Converts a dispatcher response to an HTTP response.
pub fn to_http(response: PageResponse) -> Response {
    let built = match response {
        PageResponse::Html { status, headers, body } => {
            let mut builder = Response::builder().status(status_code(status, StatusCode::OK));
            let has_content_type = headers.keys().any(|key| key.eq_ignore_ascii_case("content-type"));
            for (key, value) in headers {
                builder = builder.header(key, value);
            }
            if !has_content_type {
                builder = builder.header(header::CONTENT_TYPE, "text/html; charset=utf-8");
            }
            builder.body(Body::from(body))
        }
        PageResponse::Json { status, headers, body } => {
            let mut builder = Response::builder()
                .status(status_code(status, StatusCode::OK))
                .header(header::CONTENT_TYPE, "application/json");
            for (key, value) in headers {
                builder = builder.header(key, value);
            }
            builder.body(Body::from(serde_json::to_string(&body).unwrap_or_default()))
        }
        PageResponse::Asset {
            status,
            content_type,
            etag,
            body,
        } => Response::builder()
            .status(status_code(status, StatusCode::OK))
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ETAG, etag)
            .body(Body::from(body)),
        PageResponse::Redirect { status, location } => Response::builder()
            .status(status_code(status, StatusCode::FOUND))
            .header(header::LOCATION, location)
            .body(Body::empty()),
        PageResponse::Error { status, message } => {
            return error_page(status_code(status, StatusCode::INTERNAL_SERVER_ERROR), &message)
        }
    };

    built.unwrap_or_else(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build response").into_response())
}

fn status_code(status: u16, fallback: StatusCode) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(fallback)
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let page = Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{status}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; padding: 2rem; background: #f5f5f5; color: #333; }}
        .error {{ background: white; border-left: 4px solid #e53e3e; padding: 1rem; border-radius: 4px; }}
    </style>
</head>
<body>
    <h1>{status}</h1>
    <div class="error"><pre>{message}</pre></div>
</body>
</html>"#,
        status = status,
        message = pagewright::widget::escape_html(message)
    ));
    (status, page).into_response()
}
