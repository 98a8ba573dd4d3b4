// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `@Require` and `@Errors`.

use super::text::escape_html;
use super::{RenderContext, Renderable, WidgetChain, WidgetKind};
use crate::error::Result;
use crate::respond::{Respond, StringRespond};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Renders its element once into the response's require set.
///
/// Typically wraps `<script src>` or `<link rel="stylesheet">` tags so that
/// several embedded pages asking for the same dependency emit it once, in
/// the document head.
#[derive(Debug)]
pub struct RequireWidget {
    children: Arc<WidgetChain>,
}

impl RequireWidget {
    /// Creates a require widget.
    pub fn new(children: WidgetChain) -> Self {
        Self {
            children: Arc::new(children),
        }
    }
}

impl Renderable for RequireWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        let mut buffer = StringRespond::new();
        self.children.render(ctx, bound, &mut buffer)?;
        respond.require(buffer.raw());
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Require
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        let children: Arc<dyn Renderable> = self.children.clone();
        visit(&children);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lists the errors recorded on the response, if any.
#[derive(Debug, Default)]
pub struct ErrorsWidget;

impl Renderable for ErrorsWidget {
    fn render(&self, _ctx: &RenderContext<'_>, _bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        if respond.errors().is_empty() {
            return Ok(());
        }

        let mut out = String::from("<ul class=\"errors\">");
        for error in respond.errors() {
            out.push_str("<li>");
            out.push_str(&escape_html(error));
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        respond.write(&out);
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Errors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
