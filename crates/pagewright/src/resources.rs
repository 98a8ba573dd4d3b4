// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Static resources served before page lookup.
//!
//! Resources are registered at exact URIs with their bytes and content
//! type. Each gets a strong ETag (SHA-256 of the content); a request whose
//! `If-None-Match` carries the same tag gets an empty 304.

use crate::request::Request;
use crate::response::PageResponse;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A registered static resource.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Content-Type header value.
    pub content_type: String,
    /// Quoted strong entity tag.
    pub etag: String,
    /// Content.
    pub bytes: Vec<u8>,
}

impl Resource {
    /// Creates a resource and computes its ETag.
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Self {
            content_type: content_type.into(),
            etag: format!("\"{:x}\"", hasher.finalize()),
            bytes,
        }
    }
}

/// Guesses a content type from a file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Exact-URI static resources.
#[derive(Debug, Default)]
pub struct ResourceBook {
    resources: RwLock<HashMap<String, Resource>>,
}

impl ResourceBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource at `uri`, replacing any previous one.
    pub fn at(&self, uri: &str, resource: Resource) {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.to_string(), resource);
    }

    /// The resource at `uri`.
    pub fn get(&self, uri: &str) -> Option<Resource> {
        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    /// Registered URIs, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self
            .resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        uris.sort();
        uris
    }

    /// Serves `request` if it names a resource.
    pub fn serve(&self, request: &Request) -> Option<PageResponse> {
        let resource = self.get(&request.path)?;

        let fresh = request
            .header("if-none-match")
            .is_some_and(|tags| tags.split(',').any(|tag| tag.trim() == resource.etag || tag.trim() == "*"));

        Some(PageResponse::Asset {
            status: if fresh { 304 } else { 200 },
            content_type: resource.content_type,
            etag: resource.etag,
            body: if fresh { Vec::new() } else { resource.bytes },
        })
    }
}
