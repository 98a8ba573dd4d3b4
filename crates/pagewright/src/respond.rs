// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Output sinks for widget rendering.
//!
//! Widgets write into a [`Respond`]. Besides the main text buffer a respond
//! carries a head buffer, a redirect slot, a list of error messages and a set
//! of "require" snippets (script and style tags) that are emitted once no
//! matter how many embedded pages ask for them.
//!
//! # Head placement
//!
//! [`StringRespond`] does not know where `<head>` ends while widgets are still
//! writing. The header widget writes [`HEADER_PLACEHOLDER`] instead, and
//! [`Respond::body`] swaps the placeholder for the requires and head buffer.
//!
//! # Embedding
//!
//! [`EmbeddedRespond`] wraps a respond used to render one page inside
//! another. Reading it extracts the content of `<body>` once and caches it.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

/// Marker written by the header widget where head content belongs.
pub const HEADER_PLACEHOLDER: &str = "\u{0}pw:head\u{0}";

/// A per-request output sink.
pub trait Respond {
    /// Appends text to the body buffer.
    fn write(&mut self, text: &str);

    /// Appends text to the head buffer.
    fn write_to_head(&mut self, text: &str);

    /// The head buffer.
    fn head(&self) -> String;

    /// The rendered document.
    fn body(&self) -> String;

    /// Requests a redirect. Only the first call per request takes effect.
    fn redirect(&mut self, uri: &str);

    /// The pending redirect, if any.
    fn redirect_target(&self) -> Option<&str>;

    /// Records an error message for the errors widget.
    fn add_error(&mut self, message: String);

    /// Recorded error messages.
    fn errors(&self) -> &[String];

    /// Interns a require snippet. Returns false if it was already present.
    fn require(&mut self, snippet: &str) -> bool;

    /// Interned require snippets, in first-seen order.
    fn requires(&self) -> &[String];

    /// Rendered content of a named argument passed by an including page.
    fn include(&self, _name: &str) -> Option<&str> {
        None
    }
}

/// The default [`Respond`], an in-memory string buffer.
#[derive(Debug, Default, Clone)]
pub struct StringRespond {
    out: String,
    head: String,
    redirect: Option<String>,
    errors: Vec<String>,
    requires: Vec<String>,
    seen: HashSet<String>,
}

impl StringRespond {
    /// Creates an empty respond.
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw body buffer, placeholder included.
    pub fn raw(&self) -> &str {
        &self.out
    }
}

impl Respond for StringRespond {
    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn write_to_head(&mut self, text: &str) {
        self.head.push_str(text);
    }

    fn head(&self) -> String {
        self.head.clone()
    }

    fn body(&self) -> String {
        if !self.out.contains(HEADER_PLACEHOLDER) {
            return self.out.clone();
        }

        let mut head = String::new();
        for snippet in &self.requires {
            head.push_str(snippet);
        }
        head.push_str(&self.head);
        self.out.replacen(HEADER_PLACEHOLDER, &head, 1)
    }

    fn redirect(&mut self, uri: &str) {
        if self.redirect.is_none() {
            self.redirect = Some(uri.to_string());
        }
    }

    fn redirect_target(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }

    fn require(&mut self, snippet: &str) -> bool {
        if !self.seen.insert(snippet.to_string()) {
            return false;
        }
        self.requires.push(snippet.to_string());
        true
    }

    fn requires(&self) -> &[String] {
        &self.requires
    }
}

/// Finds the content of the first `<body>` element.
///
/// The closing `>` of the opening tag is located with a quote-aware scan, so
/// `>` inside an attribute value does not end the tag. Content runs until the
/// first `</body>`. Documents without a body tag are returned whole.
pub fn extract_body(document: &str) -> &str {
    let Some(open) = document.find("<body") else {
        return document;
    };

    let mut quote: Option<u8> = None;
    let mut start = None;
    for (offset, &byte) in document.as_bytes()[open..].iter().enumerate() {
        match (quote, byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(byte),
            (None, b'>') => {
                start = Some(open + offset + 1);
                break;
            }
            (None, _) => {}
        }
    }

    let Some(start) = start else {
        return document;
    };

    match document[start..].find("</body>") {
        Some(end) => &document[start..start + end],
        None => &document[start..],
    }
}

/// A respond for rendering one page inside another.
///
/// Writes go to the wrapped delegate. The first call to [`Respond::body`]
/// (or [`EmbeddedRespond::extracted`]) extracts the `<body>` content of
/// the delegate's document and caches it; later calls reuse the cached
/// text.
#[derive(Debug)]
pub struct EmbeddedRespond<R: Respond = StringRespond> {
    delegate: R,
    arguments: HashMap<String, String>,
    body: OnceCell<String>,
}

impl<R: Respond> EmbeddedRespond<R> {
    /// Wraps a delegate.
    pub fn new(delegate: R) -> Self {
        Self::with_arguments(delegate, HashMap::new())
    }

    /// Wraps a delegate and exposes rendered arguments through [`Respond::include`].
    pub fn with_arguments(delegate: R, arguments: HashMap<String, String>) -> Self {
        Self {
            delegate,
            arguments,
            body: OnceCell::new(),
        }
    }

    /// The extracted body, computed on first use.
    pub fn extracted(&self) -> &str {
        self.body
            .get_or_init(|| extract_body(&self.delegate.body()).to_string())
    }

    /// True once the body has been extracted.
    pub fn is_extracted(&self) -> bool {
        self.body.get().is_some()
    }

    /// Unwraps the delegate.
    pub fn into_inner(self) -> R {
        self.delegate
    }

    /// Copies this respond's head, requires, errors and extracted body into `parent`.
    pub fn splice_into(&self, parent: &mut dyn Respond) {
        for snippet in self.delegate.requires() {
            parent.require(snippet);
        }
        parent.write_to_head(&self.head());
        parent.write(self.extracted());
        if let Some(uri) = self.delegate.redirect_target() {
            parent.redirect(uri);
        }
    }
}

impl<R: Respond> Respond for EmbeddedRespond<R> {
    fn write(&mut self, text: &str) {
        self.delegate.write(text);
    }

    fn write_to_head(&mut self, text: &str) {
        self.delegate.write_to_head(text);
    }

    fn head(&self) -> String {
        self.delegate.head()
    }

    fn body(&self) -> String {
        self.extracted().to_string()
    }

    fn redirect(&mut self, uri: &str) {
        self.delegate.redirect(uri);
    }

    fn redirect_target(&self) -> Option<&str> {
        self.delegate.redirect_target()
    }

    fn add_error(&mut self, message: String) {
        self.delegate.add_error(message);
    }

    fn errors(&self) -> &[String] {
        self.delegate.errors()
    }

    fn require(&mut self, snippet: &str) -> bool {
        self.delegate.require(snippet)
    }

    fn requires(&self) -> &[String] {
        self.delegate.requires()
    }

    fn include(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}
