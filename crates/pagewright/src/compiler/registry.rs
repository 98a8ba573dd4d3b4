// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Annotation name to widget factory mapping.

use crate::bind::parse_bind_expression;
use crate::error::{PagewrightError, Result};
use crate::page::PageBook;
use crate::widget::{
    ArgumentWidget, DecorateWidget, EmbedWidget, ErrorsWidget, IncludeWidget, Renderable,
    RepeatWidget, RequireWidget, ShowIfWidget, WidgetChain, DEFAULT_PAGE_VAR, DEFAULT_VAR,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What an annotation applies to.
#[derive(Debug)]
pub struct AnnotationTarget {
    /// Annotation name, without `@`.
    pub name: String,
    /// Text between the parentheses, if any.
    pub args: Option<String>,
    /// The annotated element (or the widget built by an inner annotation).
    pub element: Arc<dyn Renderable>,
    /// The element's children.
    pub content: Vec<Arc<dyn Renderable>>,
}

impl AnnotationTarget {
    /// A chain holding just the element.
    pub fn element_chain(&self) -> WidgetChain {
        WidgetChain::singleton(self.element.clone())
    }

    /// A chain holding the element's children.
    pub fn content_chain(&self) -> Result<WidgetChain> {
        let chain = WidgetChain::proceeding();
        for widget in &self.content {
            chain.add_widget(widget.clone())?;
        }
        Ok(chain)
    }

    /// The arguments, which must be present and non-empty.
    pub fn required_args(&self) -> Result<&str> {
        self.args
            .as_deref()
            .map(str::trim)
            .filter(|args| !args.is_empty())
            .ok_or_else(|| PagewrightError::CompileError(format!("@{} requires arguments", self.name)))
    }

    /// The arguments as a single, optionally quoted, name.
    pub fn single_name(&self) -> Result<String> {
        let args = self.required_args()?;
        Ok(args.trim_matches(|c| c == '"' || c == '\'').to_string())
    }
}

/// Builds a widget for an annotation.
pub type WidgetFactory = Arc<dyn Fn(&AnnotationTarget) -> Result<Arc<dyn Renderable>> + Send + Sync>;

/// Maps annotation names to widget factories.
///
/// Names not in the registry resolve to an embed when a page is embeddable
/// under that name, and are compile errors otherwise.
#[derive(Clone)]
pub struct WidgetRegistry {
    factories: HashMap<String, WidgetFactory>,
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRegistry {
    /// A registry with the built-in annotations.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_repeat(DEFAULT_VAR, DEFAULT_PAGE_VAR);
        registry.register("ShowIf", |target| {
            let condition = target.required_args()?.to_string();
            Ok(Arc::new(ShowIfWidget::new(condition, target.element_chain())))
        });
        registry.register("Require", |target| Ok(Arc::new(RequireWidget::new(target.element_chain()))));
        registry.register("Decorated", |_| Ok(Arc::new(DecorateWidget)));
        registry.register("Argument", |target| {
            Ok(Arc::new(ArgumentWidget::new(target.single_name()?, target.content_chain()?)))
        });
        registry.register("Include", |target| Ok(Arc::new(IncludeWidget::new(target.single_name()?))));
        registry.register("Errors", |_| Ok(Arc::new(ErrorsWidget)));
        registry
    }

    /// Changes the default `@Repeat` variable names.
    pub fn with_repeat_vars(mut self, var: &str, page_var: &str) -> Self {
        self.register_repeat(var, page_var);
        self
    }

    fn register_repeat(&mut self, var: &str, page_var: &str) {
        let (var, page_var) = (var.to_string(), page_var.to_string());
        self.register("Repeat", move |target| {
            let args = target.required_args()?;
            let (items, var, page_var) = if args.contains('=') {
                let map = parse_bind_expression(args)?;
                let items = map.get("items").cloned().ok_or_else(|| {
                    PagewrightError::CompileError("@Repeat requires items=".to_string())
                })?;
                (
                    items,
                    map.get("var").cloned().unwrap_or_else(|| var.clone()),
                    map.get("pageVar").cloned().unwrap_or_else(|| page_var.clone()),
                )
            } else {
                (args.to_string(), var.clone(), page_var.clone())
            };

            Ok(Arc::new(
                RepeatWidget::new(items, target.element_chain())
                    .with_var(var)
                    .with_page_var(page_var),
            ))
        });
    }

    /// Registers (or replaces) a factory.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AnnotationTarget) -> Result<Arc<dyn Renderable>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// True if `name` has a factory.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the widget for `target`.
    pub fn build(&self, target: &AnnotationTarget, book: &PageBook) -> Result<Arc<dyn Renderable>> {
        if let Some(factory) = self.factories.get(&target.name) {
            return factory(target);
        }

        if book.for_name(&target.name).is_some() {
            let mut bindings: Vec<(String, String)> = match target.args.as_deref().map(str::trim) {
                Some(args) if !args.is_empty() => parse_bind_expression(args)?.into_iter().collect(),
                _ => Vec::new(),
            };
            bindings.sort();
            return Ok(Arc::new(EmbedWidget::new(
                target.name.clone(),
                bindings,
                target.content_chain()?,
            )));
        }

        Err(PagewrightError::CompileError(format!(
            "unknown annotation @{}",
            target.name
        )))
    }
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("WidgetRegistry").field("annotations", &names).finish()
    }
}
