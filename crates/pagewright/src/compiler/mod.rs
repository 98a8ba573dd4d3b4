// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template compilation.
//!
//! Templates are HTML with `${expr}` interpolation and annotations. An
//! annotation is `@Name` or `@Name(args)` directly before an element and
//! turns that element into a widget:
//!
//! ```html
//! <ul>
//!   @Repeat(items=todos var=todo)
//!   <li class="${todo.state}">${todo.title}</li>
//! </ul>
//! @ShowIf(user.admin) <a href="/admin">Admin</a>
//! @UserCard(user=current) <div>@Argument(footer) <p>bye</p></div>
//! ```
//!
//! Built-in annotations are `Repeat`, `ShowIf`, `Require`, `Decorated`,
//! `Argument`, `Include` and `Errors`; any page registered with
//! [`PageBook::embed_as`] is an annotation too. Custom annotations are added
//! through the [`WidgetRegistry`].

mod registry;

pub use registry::{AnnotationTarget, WidgetFactory, WidgetRegistry};

use crate::error::{PagewrightError, Result, SourceContext};
use crate::page::PageBook;
use crate::widget::{
    tokenize, Attribute, Closing, HeaderWidget, RawTextWidget, Renderable, TextToken, TextWidget,
    WidgetChain, XmlWidget,
};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[grammar = "compiler/template.pest"]
struct TemplateParser;

/// Compiles template text into widget trees.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    registry: &'a WidgetRegistry,
    book: &'a PageBook,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler resolving annotations through `registry` and
    /// embeds through `book`.
    pub fn new(registry: &'a WidgetRegistry, book: &'a PageBook) -> Self {
        Self { registry, book }
    }

    /// Compiles `source`. `name` is used in error messages.
    pub fn compile(&self, name: &str, source: &str) -> Result<Arc<dyn Renderable>> {
        let template = TemplateParser::parse(Rule::template, source)
            .map_err(|e| parse_error(name, source, e))?
            .next()
            .ok_or_else(|| PagewrightError::CompileError(format!("{}: empty parse", name)))?;

        let root = WidgetChain::proceeding();
        for pair in template.into_inner() {
            if let Some(widget) = self.compile_node(name, pair)? {
                root.add_widget(widget)?;
            }
        }

        debug!(template = name, widgets = root.len(), "Compiled template");
        Ok(Arc::new(root))
    }

    fn compile_node(&self, name: &str, pair: Pair<'_, Rule>) -> Result<Option<Arc<dyn Renderable>>> {
        let widget: Arc<dyn Renderable> = match pair.as_rule() {
            Rule::comment | Rule::doctype => Arc::new(RawTextWidget::new(pair.as_str())),
            Rule::text => text_widget(pair.as_str()).map_err(|e| at(name, &pair, e))?,
            Rule::annotated => self.compile_annotated(name, pair)?,
            Rule::self_closing | Rule::raw_element | Rule::void_element | Rule::normal_element => {
                self.compile_element(name, pair)?.0
            }
            _ => return Ok(None),
        };
        Ok(Some(widget))
    }

    fn compile_annotated(&self, name: &str, pair: Pair<'_, Rule>) -> Result<Arc<dyn Renderable>> {
        let position = pair.clone();
        let mut inner = pair.into_inner();
        let (Some(annotation), Some(target)) = (inner.next(), inner.next()) else {
            return Err(at(name, &position, malformed("annotation")));
        };

        let (element, content) = match target.as_rule() {
            Rule::annotated => {
                let widget = self.compile_annotated(name, target)?;
                (widget.clone(), vec![widget])
            }
            _ => self.compile_element(name, target)?,
        };

        let mut parts = annotation.into_inner();
        let annotation_name = parts
            .next()
            .map(|p| p.as_str().to_string())
            .ok_or_else(|| at(name, &position, malformed("annotation")))?;
        let args = parts.next().map(|p| p.as_str().to_string());

        let target = AnnotationTarget {
            name: annotation_name,
            args,
            element,
            content,
        };
        self.registry
            .build(&target, self.book)
            .map_err(|e| at(name, &position, e))
    }

    /// Returns the element widget and its compiled children.
    fn compile_element(
        &self,
        name: &str,
        pair: Pair<'_, Rule>,
    ) -> Result<(Arc<dyn Renderable>, Vec<Arc<dyn Renderable>>)> {
        let rule = pair.as_rule();
        let position = pair.clone();

        let mut tag = String::new();
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut children: Vec<Arc<dyn Renderable>> = Vec::new();

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::tag_name | Rule::raw_tag | Rule::void_tag => tag = part.as_str().to_string(),
                Rule::attribute => {
                    attributes.push(attribute(part).map_err(|e| at(name, &position, e))?)
                }
                Rule::raw_content => {
                    if !part.as_str().is_empty() {
                        children.push(Arc::new(RawTextWidget::new(part.as_str())));
                    }
                }
                _ => {
                    if let Some(widget) = self.compile_node(name, part)? {
                        children.push(widget);
                    }
                }
            }
        }

        let chain = WidgetChain::proceeding();
        for child in &children {
            chain.add_widget(child.clone())?;
        }

        let widget: Arc<dyn Renderable> = match rule {
            Rule::normal_element if tag.eq_ignore_ascii_case("head") => {
                Arc::new(HeaderWidget::new(attributes, chain))
            }
            Rule::void_element => Arc::new(XmlWidget::new(tag, attributes, chain, Closing::Void)),
            Rule::self_closing => Arc::new(XmlWidget::new(tag, attributes, chain, Closing::SelfClosing)),
            _ => Arc::new(XmlWidget::new(tag, attributes, chain, Closing::Normal)),
        };
        Ok((widget, children))
    }
}

fn text_widget(text: &str) -> Result<Arc<dyn Renderable>> {
    let tokens = tokenize(text)?;
    if tokens.iter().all(|t| matches!(t, TextToken::Literal(_))) {
        return Ok(Arc::new(RawTextWidget::new(text)));
    }
    Ok(Arc::new(TextWidget::new(tokens)))
}

fn attribute(pair: Pair<'_, Rule>) -> Result<Attribute> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| malformed("attribute"))?;
    let value = inner.next().map(|p| tokenize(p.as_str())).transpose()?;
    Ok((name, value))
}

fn malformed(what: &str) -> PagewrightError {
    PagewrightError::CompileError(format!("malformed {}", what))
}

/// Prefixes compile errors with the template name and position.
fn at(name: &str, pair: &Pair<'_, Rule>, error: PagewrightError) -> PagewrightError {
    match error {
        PagewrightError::CompileError(message) => {
            let (line, column) = pair.as_span().start_pos().line_col();
            PagewrightError::CompileError(format!(
                "{}:{}:{}: {}",
                name, line, column, message
            ))
        }
        other => other,
    }
}

fn parse_error(name: &str, source: &str, error: pest::error::Error<Rule>) -> PagewrightError {
    let (line, column) = match error.line_col {
        pest::error::LineColLocation::Pos(pos) => pos,
        pest::error::LineColLocation::Span(start, _) => start,
    };
    PagewrightError::ParseError {
        message: error.variant.message().to_string(),
        line,
        column,
        file: Some(name.to_string()),
        source_context: Some(SourceContext::from_source(source, line, column)),
    }
}
