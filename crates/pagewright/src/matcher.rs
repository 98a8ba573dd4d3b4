// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! URI template matching.
//!
//! A URI template such as `/users/:id/posts/:post{\d+}` is compiled once into
//! a [`PathMatcherChain`], an ordered list of per-segment matchers:
//!
//! - `users` → literal segment, compared by exact string equality
//! - `:id` → greedy variable, accepts any single non-empty segment
//! - `:post{\d+}` → regex-bound variable, accepts segments fully matching the pattern
//!
//! Matching is positional. A template never matches a path with a different
//! number of segments.

use crate::error::{PagewrightError, Result};
use regex::Regex;
use std::collections::HashMap;

/// Splits a path into segments the way template and request paths are compared.
///
/// Leading empty segments are kept (so `/a` and `a` differ), trailing empty
/// segments are dropped (so `/a/` and `/a` are equal, and `/` has no segments).
pub fn split_path(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
}

/// A single segment matcher.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Exact string equality.
    Literal(String),

    /// `:name`, matches any non-empty segment.
    Greedy(String),

    /// `:name{pattern}`, matches segments that fully match `pattern`.
    Bound {
        /// Variable name.
        name: String,
        /// The anchored pattern.
        pattern: Regex,
    },
}

impl PathMatcher {
    /// Parses one template segment.
    pub fn parse(segment: &str, template: &str) -> Result<Self> {
        let Some(rest) = segment.strip_prefix(':') else {
            return Ok(PathMatcher::Literal(segment.to_string()));
        };

        let Some(open) = rest.find('{') else {
            return Ok(PathMatcher::Greedy(rest.to_string()));
        };

        if !rest.ends_with('}') {
            return Err(PagewrightError::PatternError {
                template: template.to_string(),
                message: format!("unterminated pattern in segment {:?}", segment),
            });
        }

        let name = &rest[..open];
        let raw = &rest[open + 1..rest.len() - 1];
        let pattern = Regex::new(&format!("^(?:{})$", raw)).map_err(|e| {
            PagewrightError::PatternError {
                template: template.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(PathMatcher::Bound {
            name: name.to_string(),
            pattern,
        })
    }

    /// Returns true if this matcher accepts the given segment.
    pub fn matches(&self, segment: &str) -> bool {
        match self {
            PathMatcher::Literal(literal) => literal == segment,
            PathMatcher::Greedy(_) => !segment.is_empty(),
            PathMatcher::Bound { pattern, .. } => pattern.is_match(segment),
        }
    }

    /// The captured variable name; literals have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            PathMatcher::Literal(_) => None,
            PathMatcher::Greedy(name) => Some(name),
            PathMatcher::Bound { name, .. } => Some(name),
        }
    }

    /// Returns true for variable matchers.
    pub fn is_variable(&self) -> bool {
        !matches!(self, PathMatcher::Literal(_))
    }
}

/// An immutable, ordered sequence of segment matchers built from a URI template.
#[derive(Debug, Clone)]
pub struct PathMatcherChain {
    template: String,
    matchers: Vec<PathMatcher>,
}

impl PathMatcherChain {
    /// Compiles a URI template.
    pub fn compile(template: &str) -> Result<Self> {
        let matchers = split_path(template)
            .into_iter()
            .map(|segment| PathMatcher::parse(segment, template))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            template: template.to_string(),
            matchers,
        })
    }

    /// The template this chain was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The compiled matchers, in order.
    pub fn matchers(&self) -> &[PathMatcher] {
        &self.matchers
    }

    /// The first non-empty matcher, which decides the registry bucket.
    pub fn head(&self) -> Option<&PathMatcher> {
        self.matchers
            .iter()
            .find(|m| !matches!(m, PathMatcher::Literal(s) if s.is_empty()))
    }

    /// Names of all variables in the template, in order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.matchers.iter().filter_map(PathMatcher::name).collect()
    }

    /// Returns true if the path matches this template.
    pub fn matches(&self, path: &str) -> bool {
        self.find_matches(path).is_some()
    }

    /// Matches the path and extracts variable values.
    ///
    /// Returns `None` when the path does not match.
    pub fn find_matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let segments = split_path(path);
        if self.matchers.len() > segments.len() {
            return None;
        }

        let mut values = HashMap::new();
        for (index, matcher) in self.matchers.iter().enumerate() {
            // Path ran out: only a matcher that accepts "" may close the match.
            let Some(segment) = segments.get(index) else {
                return matcher.matches("").then_some(values);
            };

            if !matcher.matches(segment) {
                return None;
            }

            if let Some(name) = matcher.name() {
                values.insert(name.to_string(), segment.to_string());
            }
        }

        if segments.len() > self.matchers.len() {
            return None;
        }

        Some(values)
    }
}
