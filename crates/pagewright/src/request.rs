// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP request abstraction for pagewright.
//!
//! A platform-agnostic request that adapters (HTTP servers, tests) build and
//! hand to the dispatcher. Parameters are multi-valued: `?tag=a&tag=b`
//! yields two values for `tag`, in order.

use std::collections::HashMap;

/// A platform-agnostic HTTP request.
///
/// # Example
///
/// ```rust
/// use pagewright::Request;
///
/// let request = Request::new("/search", "get").with_query_string("q=rust&tag=a&tag=b");
/// assert_eq!(request.method, "GET");
/// assert_eq!(request.param("q"), Some("rust"));
/// assert_eq!(request.params("tag"), ["a", "b"]);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// The request path, relative to the context path (e.g., "/users/42")
    pub path: String,

    /// The HTTP method, upper case (e.g., "GET", "POST")
    pub method: String,

    /// Deployment prefix the application is mounted under (e.g., "/app"); empty at root
    pub context_path: String,

    /// HTTP headers, keys lower case
    pub headers: HashMap<String, String>,

    /// Query and form parameters
    pub params: HashMap<String, Vec<String>>,

    /// Cookies
    pub cookies: HashMap<String, String>,
}

impl Request {
    /// Creates a new request with the given path and method.
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into().to_uppercase(),
            context_path: String::new(),
            headers: HashMap::new(),
            params: HashMap::new(),
            cookies: HashMap::new(),
        }
    }

    /// Sets the deployment context path.
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into().trim_end_matches('/').to_string();
        self
    }

    /// Adds a header. Keys are stored lower case.
    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    /// Appends one parameter value.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_param(key, value);
        self
    }

    /// Appends the pairs of a URL-encoded query string (or form body).
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.add_urlencoded(query.as_bytes());
        self
    }

    /// Adds a cookie.
    pub fn with_cookie(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(key.into(), value.into());
        self
    }

    /// Appends one parameter value.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Appends all pairs of URL-encoded bytes.
    pub fn add_urlencoded(&mut self, bytes: &[u8]) {
        for (key, value) in form_urlencoded::parse(bytes) {
            self.add_param(key.into_owned(), value.into_owned());
        }
    }

    /// Returns the first value of a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns all values of a parameter, in request order.
    pub fn params(&self, name: &str) -> &[String] {
        self.params.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the Content-Type header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Checks if this is a URL-encoded form submission.
    pub fn is_form_submission(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new("/", "GET")
    }
}
