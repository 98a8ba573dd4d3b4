// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The compiled template tree.
//!
//! A compiled template is a tree of [`Renderable`] widgets. Leaves emit text,
//! tags and expression values; inner widgets (repeat, show-if, embed,
//! decorate) decide whether, how often and against which model their
//! [`WidgetChain`] of children renders.
//!
//! Trees are assembled once by the compiler and are read-only afterwards.
//! Pages that embed or decorate other pages refer to them by name through
//! the [`PageBook`](crate::PageBook), never by owning their trees.
//!
//! # Render context
//!
//! Everything a widget needs beyond its bound model and output sink travels
//! in a [`RenderContext`]: the page book, the evaluator, the current request
//! (for the context path and the HTTP verb), the class of the live page
//! instance and the decoration cursor.

mod decorate;
mod embed;
mod repeat;
mod require;
mod show_if;
mod text;
mod xml;

pub use decorate::DecorateWidget;
pub use embed::{ArgumentWidget, EmbedWidget, IncludeWidget};
pub use repeat::{RepeatWidget, DEFAULT_PAGE_VAR, DEFAULT_VAR};
pub use require::{ErrorsWidget, RequireWidget};
pub use show_if::ShowIfWidget;
pub use text::{escape_html, tokenize, RawTextWidget, TextToken, TextWidget};
pub use xml::{Attribute, Closing, HeaderWidget, XmlWidget, CONTEXTUAL_ATTRIBUTES};

use crate::class::PageClass;
use crate::error::{PagewrightError, Result};
use crate::evaluator::Evaluator;
use crate::page::PageBook;
use crate::request::Request;
use crate::respond::Respond;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Widget categories, used by [`collect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// A [`WidgetChain`].
    Chain,
    /// Literal text.
    RawText,
    /// Text with `${}` expressions.
    Text,
    /// An element.
    Xml,
    /// The `<head>` element.
    Header,
    /// `@Repeat`.
    Repeat,
    /// `@ShowIf`.
    ShowIf,
    /// An embedded page.
    Embed,
    /// `@Argument`, a named slot passed to an embedded page.
    Argument,
    /// `@Include`, the place an embedded page renders an argument.
    Include,
    /// `@Decorated`, the place a layout renders its subclass.
    Decorate,
    /// `@Require`.
    Require,
    /// `@Errors`.
    Errors,
}

/// Everything a widget needs while rendering, besides its model and sink.
#[derive(Clone)]
pub struct RenderContext<'a> {
    /// Registry used to resolve embedded and decorating pages.
    pub book: &'a PageBook,
    /// Expression evaluator.
    pub evaluator: &'a dyn Evaluator,
    /// The request being served.
    pub request: &'a Request,
    /// Name of the event discriminator parameter, if enabled.
    pub event_parameter: Option<&'a str>,
    /// Class of the page instance being rendered.
    pub class: Arc<PageClass>,
    /// Class whose template the decoration chain is currently inside.
    pub decorate_cursor: Option<Arc<PageClass>>,
}

impl<'a> RenderContext<'a> {
    /// Creates a context for rendering an instance of `class`.
    pub fn new(
        book: &'a PageBook,
        evaluator: &'a dyn Evaluator,
        request: &'a Request,
        class: Arc<PageClass>,
    ) -> Self {
        Self {
            book,
            evaluator,
            request,
            event_parameter: None,
            class,
            decorate_cursor: None,
        }
    }

    /// Enables the event discriminator parameter.
    pub fn with_event_parameter(mut self, name: Option<&'a str>) -> Self {
        self.event_parameter = name;
        self
    }

    /// A copy positioned inside the template of `class`.
    pub fn with_cursor(&self, class: Arc<PageClass>) -> Self {
        Self {
            decorate_cursor: Some(class),
            ..self.clone()
        }
    }

    /// A copy for rendering an instance of a different class (an embed).
    pub fn for_class(&self, class: Arc<PageClass>) -> Self {
        Self {
            class,
            decorate_cursor: None,
            ..self.clone()
        }
    }

    /// The deployment context path, without trailing slash.
    pub fn context_path(&self) -> &str {
        &self.request.context_path
    }

    /// Evaluates an expression against `bound`.
    pub fn evaluate(&self, expression: &str, bound: &Value) -> Result<Value> {
        self.evaluator.evaluate(expression, bound)
    }
}

/// A node in a compiled template.
pub trait Renderable: Send + Sync + fmt::Debug {
    /// Writes this node's output for `bound` into `respond`.
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond)
        -> Result<()>;

    /// The widget category.
    fn kind(&self) -> WidgetKind;

    /// Visits direct children.
    fn for_each_child(&self, _visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {}

    /// For downcasting collected widgets.
    fn as_any(&self) -> &dyn Any;
}

/// Returns `root` and all of its descendants of the given kind, in document order.
pub fn collect(root: &Arc<dyn Renderable>, kind: WidgetKind) -> Vec<Arc<dyn Renderable>> {
    let mut found = Vec::new();
    collect_into(root, kind, &mut found);
    found
}

fn collect_into(node: &Arc<dyn Renderable>, kind: WidgetKind, found: &mut Vec<Arc<dyn Renderable>>) {
    if node.kind() == kind {
        found.push(node.clone());
    }
    node.for_each_child(&mut |child| collect_into(child, kind, found));
}

/// An ordered group of widgets.
#[derive(Debug)]
pub enum WidgetChain {
    /// Renders nothing and ignores additions.
    Terminal,
    /// Exactly one widget; additions are errors.
    Singleton(Arc<dyn Renderable>),
    /// Any number of widgets, appended in document order.
    Proceeding(RwLock<Vec<Arc<dyn Renderable>>>),
}

impl WidgetChain {
    /// The null chain.
    pub fn terminal() -> Self {
        WidgetChain::Terminal
    }

    /// A chain holding exactly `widget`.
    pub fn singleton(widget: Arc<dyn Renderable>) -> Self {
        WidgetChain::Singleton(widget)
    }

    /// An empty appendable chain.
    pub fn proceeding() -> Self {
        WidgetChain::Proceeding(RwLock::new(Vec::new()))
    }

    /// Appends a widget.
    ///
    /// Terminal chains ignore the widget; singleton chains refuse it.
    pub fn add_widget(&self, widget: Arc<dyn Renderable>) -> Result<()> {
        match self {
            WidgetChain::Terminal => Ok(()),
            WidgetChain::Singleton(_) => Err(PagewrightError::ChainFull),
            WidgetChain::Proceeding(widgets) => {
                widgets
                    .write()
                    .map_err(|_| PagewrightError::RenderError("widget chain lock poisoned".into()))?
                    .push(widget);
                Ok(())
            }
        }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        match self {
            WidgetChain::Terminal => 0,
            WidgetChain::Singleton(_) => 1,
            WidgetChain::Proceeding(widgets) => widgets.read().map(|w| w.len()).unwrap_or(0),
        }
    }

    /// True if the chain has no children.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Result<Vec<Arc<dyn Renderable>>> {
        match self {
            WidgetChain::Terminal => Ok(Vec::new()),
            WidgetChain::Singleton(widget) => Ok(vec![widget.clone()]),
            WidgetChain::Proceeding(widgets) => widgets
                .read()
                .map(|w| w.clone())
                .map_err(|_| PagewrightError::RenderError("widget chain lock poisoned".into())),
        }
    }
}

impl Renderable for WidgetChain {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        match self {
            WidgetChain::Terminal => Ok(()),
            WidgetChain::Singleton(widget) => widget.render(ctx, bound, respond),
            WidgetChain::Proceeding(widgets) => {
                let widgets = widgets
                    .read()
                    .map_err(|_| PagewrightError::RenderError("widget chain lock poisoned".into()))?;
                for widget in widgets.iter() {
                    widget.render(ctx, bound, respond)?;
                }
                Ok(())
            }
        }
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Chain
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        if let Ok(children) = self.snapshot() {
            for child in &children {
                visit(child);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
