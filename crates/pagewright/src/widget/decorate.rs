// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `@Decorated`: template inheritance.
//!
//! A decorated class's template is a layout. When a page whose class
//! extends it is rendered, rendering starts at the outermost decorated
//! ancestor, and each `@Decorated` placeholder renders the next more
//! specific class in the hierarchy that has a registered page. The position
//! in the hierarchy is the context's decoration cursor.

use super::{RenderContext, Renderable, WidgetKind};
use crate::error::Result;
use crate::respond::{EmbeddedRespond, Respond, StringRespond};
use serde_json::Value;
use std::any::Any;
use tracing::debug;

/// Placeholder where a layout renders its subclass.
#[derive(Debug, Default)]
pub struct DecorateWidget;

impl Renderable for DecorateWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        let Some(cursor) = &ctx.decorate_cursor else {
            return Ok(());
        };

        // Nearest first, so everything more specific than the cursor comes before it.
        let ancestry = ctx.class.ancestry();
        let Some(position) = ancestry.iter().position(|class| class.name() == cursor.name()) else {
            debug!(cursor = cursor.name(), class = ctx.class.name(), "Decoration cursor outside hierarchy");
            return Ok(());
        };

        let next = ancestry[..position].iter().rev().find_map(|class| {
            let page = ctx.book.for_class(class.name())?;
            let widget = page.widget()?.clone();
            Some((class.clone(), widget))
        });

        let Some((class, widget)) = next else {
            return Ok(());
        };

        let mut decorated = EmbeddedRespond::new(StringRespond::new());
        widget.render(&ctx.with_cursor(class), bound, &mut decorated)?;
        decorated.splice_into(respond);
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Decorate
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::testing::Fixture;
    use serde_json::json;

    #[test]
    fn test_without_cursor_renders_nothing() {
        let fixture = Fixture::new();
        let mut respond = StringRespond::new();
        DecorateWidget.render(&fixture.ctx(), &json!({}), &mut respond).unwrap();
        assert_eq!(respond.body(), "");
    }

    #[test]
    fn test_cursor_at_concrete_class_renders_nothing() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let ctx = ctx.with_cursor(fixture.class.clone());
        let mut respond = StringRespond::new();
        DecorateWidget.render(&ctx, &json!({}), &mut respond).unwrap();
        assert_eq!(respond.body(), "");
    }
}
