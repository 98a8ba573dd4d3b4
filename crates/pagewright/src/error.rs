// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for pagewright.
//!
//! This module defines [`PagewrightError`], the main error enum, and helper types
//! for rich error reporting with source context.
//!
//! # Error Categories
//!
//! - **Pattern errors**: Invalid URI templates or regex-bound segments
//! - **Parse errors**: Invalid template syntax
//! - **Compile errors**: Unknown annotations, malformed annotation arguments
//! - **Registration errors**: Page and handler tables that fail validation
//! - **Evaluation errors**: Expressions that cannot be read or written
//! - **Render errors**: Failures while walking a widget tree
//! - **Dispatch errors**: Handler failures, wrapped with their cause
//!
//! # Source Context
//!
//! Parse errors include [`SourceContext`] for rich error messages
//! showing the problematic markup with line numbers and a caret pointing
//! to the exact error location.

use std::fmt;
use thiserror::Error;

/// Boxed error returned by page handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Source context for enhanced error messages.
///
/// Captures a snippet of source around an error location,
/// enabling rich error messages with line numbers and visual indicators.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// All lines from the source file.
    pub lines: Vec<String>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// The column number where the error occurred (1-indexed).
    pub error_column: usize,
    /// First line number of the snippet (1-indexed).
    pub snippet_start: usize,
    /// Last line number of the snippet (1-indexed).
    pub snippet_end: usize,
}

impl SourceContext {
    /// Creates a source context from template source and error location.
    ///
    /// Captures 2 lines before and after the error line.
    pub fn from_source(source: &str, line: usize, column: usize) -> Self {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
        let snippet_start = line.saturating_sub(2).max(1);
        let snippet_end = (line + 2).min(lines.len());

        Self {
            lines,
            error_line: line,
            error_column: column,
            snippet_start,
            snippet_end,
        }
    }

    /// Formats the source snippet with line numbers and error indicator.
    ///
    /// Returns a string like:
    /// ```text
    ///    4 | <ul>
    ///    5 |   @Repeat(items names)
    ///      |   ^
    ///    6 | </ul>
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();

        for line_num in self.snippet_start..=self.snippet_end {
            if line_num > self.lines.len() {
                break;
            }

            let line = &self.lines[line_num - 1];
            result.push_str(&format!("{:4} | {}\n", line_num, line));

            if line_num == self.error_line {
                result.push_str(&format!(
                    "     | {}^\n",
                    " ".repeat(self.error_column.saturating_sub(1))
                ));
            }
        }

        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// Helper struct for displaying optional source context.
pub struct OptSourceContextDisplay<'a>(pub &'a Option<SourceContext>);

impl fmt::Display for OptSourceContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ctx) => write!(f, "{}", ctx),
            None => Ok(()),
        }
    }
}

/// Helper trait for formatting optional source context.
pub trait AsDisplay<'a> {
    /// Wraps self for Display formatting.
    fn as_display(&'a self) -> OptSourceContextDisplay<'a>;
}

impl<'a> AsDisplay<'a> for Option<SourceContext> {
    fn as_display(&'a self) -> OptSourceContextDisplay<'a> {
        OptSourceContextDisplay(self)
    }
}

/// The main error type for pagewright operations.
#[derive(Error, Debug)]
pub enum PagewrightError {
    /// A URI template could not be compiled.
    #[error("Invalid URI template {template:?}: {message}")]
    PatternError {
        /// The offending template.
        template: String,
        /// What was wrong with it.
        message: String,
    },

    /// Template parsing failed due to invalid syntax.
    #[error("Parse error in {file:?}: {message} at line {line}, column {column}\n{}", source_context.as_display())]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Line number where the error occurred.
        line: usize,
        /// Column number where the error occurred.
        column: usize,
        /// The template name, if known.
        file: Option<String>,
        /// Source context for rich error display.
        source_context: Option<SourceContext>,
    },

    /// A parsed template could not be turned into a widget tree.
    #[error("Compile error: {0}")]
    CompileError(String),

    /// A page or handler table failed validation at registration time.
    #[error("Registration error for {page}: {message}")]
    RegistrationError {
        /// The page class being registered.
        page: String,
        /// What failed validation.
        message: String,
    },

    /// An expression could not be evaluated or written.
    #[error("Evaluation error in `{expression}`: {message}")]
    EvaluationError {
        /// The expression text.
        expression: String,
        /// Description of the failure.
        message: String,
    },

    /// Rendering a widget tree failed.
    #[error("Render error: {0}")]
    RenderError(String),

    /// A singleton widget chain received a second widget.
    #[error("Singleton widget chain already holds a widget")]
    ChainFull,

    /// A page handler failed.
    #[error("Dispatch to {page} ({method}) failed: {source}")]
    DispatchError {
        /// The page class whose handler failed.
        page: String,
        /// The handler key (`verb` or `verb+event`).
        method: String,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// A template could not be found.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),
}

impl PagewrightError {
    /// Creates an evaluation error for the given expression.
    pub fn evaluation(expression: &str, message: impl Into<String>) -> Self {
        Self::EvaluationError {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    /// Creates a registration error for the given page class.
    pub fn registration(page: &str, message: impl Into<String>) -> Self {
        Self::RegistrationError {
            page: page.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with [`PagewrightError`].
pub type Result<T> = std::result::Result<T, PagewrightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_points_at_column() {
        let ctx = SourceContext::from_source("<ul>\n  @Repeat\n</ul>", 2, 3);
        let snippet = ctx.format_snippet();
        assert!(snippet.contains("   2 |   @Repeat"));
        assert!(snippet.contains("     |   ^"));
    }

    #[test]
    fn test_dispatch_error_keeps_cause() {
        let err = PagewrightError::DispatchError {
            page: "UserPage".into(),
            method: "POSTsave".into(),
            source: "database offline".into(),
        };
        assert!(err.to_string().contains("database offline"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
