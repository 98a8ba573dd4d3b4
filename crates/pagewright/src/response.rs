// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP response abstraction for pagewright.
//!
//! The dispatcher returns a platform-agnostic [`PageResponse`]. Adapters
//! (see `pagewright-cli`) convert it to their platform-specific response type.

use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A platform-agnostic HTTP response.
///
/// # Example
///
/// ```rust
/// use pagewright::PageResponse;
///
/// let html = PageResponse::html(200, "<h1>Hello</h1>");
/// let redirect = PageResponse::redirect("/login");
/// assert!(redirect.is_redirect());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PageResponse {
    /// Rendered page
    Html {
        /// HTTP status code
        status: u16,
        /// HTTP headers
        headers: HashMap<String, String>,
        /// HTML body
        body: String,
    },

    /// JSON reply from a headless handler
    Json {
        /// HTTP status code
        status: u16,
        /// HTTP headers
        headers: HashMap<String, String>,
        /// JSON body
        body: JsonValue,
    },

    /// Static resource
    Asset {
        /// HTTP status code (200, or 304 when the ETag matched)
        status: u16,
        /// Content-Type of the resource
        content_type: String,
        /// Strong entity tag
        etag: String,
        /// Resource bytes (empty for 304)
        body: Vec<u8>,
    },

    /// Redirect response
    Redirect {
        /// HTTP status code (301, 302, 303, 307, 308)
        status: u16,
        /// Redirect location
        location: String,
    },

    /// Error response
    Error {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },
}

impl PageResponse {
    /// Creates an HTML response.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::Html {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Creates a JSON response.
    pub fn json(status: u16, body: JsonValue) -> Self {
        Self::Json {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Creates a redirect response (HTTP 302).
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            status: 302,
            location: location.into(),
        }
    }

    /// Creates a redirect response with a specific status code.
    pub fn redirect_with_status(status: u16, location: impl Into<String>) -> Self {
        Self::Redirect {
            status,
            location: location.into(),
        }
    }

    /// Creates an error response.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::Error {
            status,
            message: message.into(),
        }
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(404, message)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::error(500, message)
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Html { status, .. }
            | Self::Json { status, .. }
            | Self::Asset { status, .. }
            | Self::Redirect { status, .. }
            | Self::Error { status, .. } => *status,
        }
    }

    /// Returns true if this is a success response (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status())
    }

    /// Returns true if this is a redirect response (3xx, except 304).
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Returns true if this is an error response (4xx or 5xx).
    pub fn is_error(&self) -> bool {
        self.status() >= 400
    }

    /// Returns the HTML body, if this is an HTML response.
    pub fn html_body(&self) -> Option<&str> {
        match self {
            Self::Html { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Adds a header to the response (only for Html and Json variants).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Html { headers, .. } | Self::Json { headers, .. } = &mut self {
            headers.insert(key.into(), value.into());
        }
        self
    }
}

impl Default for PageResponse {
    fn default() -> Self {
        Self::html(200, "")
    }
}
