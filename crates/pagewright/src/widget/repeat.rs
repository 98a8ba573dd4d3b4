// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `@Repeat(items=expr var=name pageVar=name)`

use super::{RenderContext, Renderable, WidgetChain, WidgetKind};
use crate::error::{PagewrightError, Result};
use crate::respond::Respond;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

/// Default name the current element is bound to.
pub const DEFAULT_VAR: &str = "__this";

/// Default name the enclosing model is bound to.
pub const DEFAULT_PAGE_VAR: &str = "__page";

/// Renders its children once per element of a collection.
///
/// Each pass renders against a fresh object binding `var` to the element and
/// `page_var` to the enclosing bound model. A null collection renders
/// nothing; anything else that is not an array is an error.
#[derive(Debug)]
pub struct RepeatWidget {
    items: String,
    var: String,
    page_var: String,
    children: Arc<WidgetChain>,
}

impl RepeatWidget {
    /// Creates a repeat over `items` with the default variable names.
    pub fn new(items: impl Into<String>, children: WidgetChain) -> Self {
        Self {
            items: items.into(),
            var: DEFAULT_VAR.to_string(),
            page_var: DEFAULT_PAGE_VAR.to_string(),
            children: Arc::new(children),
        }
    }

    /// Sets the element variable name.
    pub fn with_var(mut self, var: impl Into<String>) -> Self {
        self.var = var.into();
        self
    }

    /// Sets the page variable name.
    pub fn with_page_var(mut self, page_var: impl Into<String>) -> Self {
        self.page_var = page_var.into();
        self
    }
}

impl Renderable for RepeatWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        let items = match ctx.evaluate(&self.items, bound)? {
            Value::Null => return Ok(()),
            Value::Array(items) => items,
            other => {
                return Err(PagewrightError::RenderError(format!(
                    "@Repeat items '{}' is not a collection: {}",
                    self.items, other
                )))
            }
        };

        for item in items {
            let mut scope = Map::new();
            scope.insert(self.var.clone(), item);
            scope.insert(self.page_var.clone(), bound.clone());
            self.children.render(ctx, &Value::Object(scope), respond)?;
        }
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Repeat
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        let children: Arc<dyn Renderable> = self.children.clone();
        visit(&children);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
