// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `@ShowIf(expr)`

use super::{RenderContext, Renderable, WidgetChain, WidgetKind};
use crate::error::{PagewrightError, Result};
use crate::respond::Respond;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Renders its children iff a boolean expression is true.
#[derive(Debug)]
pub struct ShowIfWidget {
    condition: String,
    children: Arc<WidgetChain>,
}

impl ShowIfWidget {
    /// Creates a conditional widget.
    pub fn new(condition: impl Into<String>, children: WidgetChain) -> Self {
        Self {
            condition: condition.into(),
            children: Arc::new(children),
        }
    }
}

impl Renderable for ShowIfWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        match ctx.evaluate(&self.condition, bound)? {
            Value::Bool(true) => self.children.render(ctx, bound, respond),
            Value::Bool(false) => Ok(()),
            other => Err(PagewrightError::RenderError(format!(
                "@ShowIf '{}' is not a boolean: {}",
                self.condition, other
            ))),
        }
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::ShowIf
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        let children: Arc<dyn Renderable> = self.children.clone();
        visit(&children);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
