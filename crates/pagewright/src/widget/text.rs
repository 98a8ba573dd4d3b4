// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Text widgets and `${expr}` tokenization.

use super::{RenderContext, Renderable, WidgetKind};
use crate::error::{PagewrightError, Result};
use crate::evaluator::to_display;
use crate::respond::Respond;
use serde_json::Value;
use std::any::Any;

/// A piece of tokenized text.
#[derive(Debug, Clone, PartialEq)]
pub enum TextToken {
    /// Emitted as is.
    Literal(String),
    /// Evaluated per render.
    Expr(String),
}

/// Splits text into literals and `${...}` expressions.
///
/// Braces and quotes inside an expression are balanced, so
/// `${a == "}"}` is one expression. An unclosed `${` is an error.
pub fn tokenize(text: &str) -> Result<Vec<TextToken>> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        if start > 0 {
            tokens.push(TextToken::Literal(rest[..start].to_string()));
        }
        let body = &rest[start + 2..];
        let end = closing_brace(body).ok_or_else(|| {
            PagewrightError::CompileError(format!("unclosed expression in '{}'", text))
        })?;
        let expr = body[..end].trim();
        if expr.is_empty() {
            return Err(PagewrightError::CompileError(format!(
                "empty expression in '{}'",
                text
            )));
        }
        tokens.push(TextToken::Expr(expr.to_string()));
        rest = &body[end + 1..];
    }

    if !rest.is_empty() {
        tokens.push(TextToken::Literal(rest.to_string()));
    }
    Ok(tokens)
}

fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') if depth == 0 => return Some(i),
            (None, '}') => depth -= 1,
            (None, _) => {}
        }
    }
    None
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders tokens to a string, escaping expression values.
pub(crate) fn render_tokens(
    tokens: &[TextToken],
    ctx: &RenderContext<'_>,
    bound: &Value,
) -> Result<String> {
    let mut out = String::new();
    for token in tokens {
        match token {
            TextToken::Literal(text) => out.push_str(text),
            TextToken::Expr(expr) => {
                let value = ctx.evaluate(expr, bound)?;
                out.push_str(&escape_html(&to_display(&value)));
            }
        }
    }
    Ok(out)
}

/// Literal markup or text, written unchanged.
#[derive(Debug, Clone)]
pub struct RawTextWidget {
    text: String,
}

impl RawTextWidget {
    /// Creates a raw text widget.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Renderable for RawTextWidget {
    fn render(&self, _ctx: &RenderContext<'_>, _bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        respond.write(&self.text);
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::RawText
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Text containing `${expr}` interpolations.
#[derive(Debug, Clone)]
pub struct TextWidget {
    tokens: Vec<TextToken>,
}

impl TextWidget {
    /// Creates a text widget from pre-tokenized text.
    pub fn new(tokens: Vec<TextToken>) -> Self {
        Self { tokens }
    }

    /// Tokenizes `text`.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::new(tokenize(text)?))
    }
}

impl Renderable for TextWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        respond.write(&render_tokens(&self.tokens, ctx, bound)?);
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Text
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
