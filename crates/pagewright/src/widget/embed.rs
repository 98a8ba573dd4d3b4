// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page embedding: `@SomeEmbed(prop=expr)`, `@Argument(name)` and `@Include(name)`.
//!
//! An embed point names another page registered with
//! [`PageBook::embed_as`](crate::PageBook::embed_as). At render time the
//! target is instantiated, bound properties are copied onto its model, its
//! handler for the current verb runs, and it renders into an isolated
//! respond whose head and body are then spliced into the including page.
//!
//! `@Argument(name)` elements inside the embed point are rendered against the
//! including page's model and handed to the target, which places them with
//! `@Include(name)`.

use super::{collect, RenderContext, Renderable, WidgetChain, WidgetKind};
use crate::class::Navigation;
use crate::error::{PagewrightError, Result};
use crate::respond::{EmbeddedRespond, Respond, StringRespond};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A named slot passed from an including page to an embedded one.
#[derive(Debug)]
pub struct ArgumentWidget {
    name: String,
    children: Arc<WidgetChain>,
}

impl ArgumentWidget {
    /// Creates an argument slot.
    pub fn new(name: impl Into<String>, children: WidgetChain) -> Self {
        Self {
            name: name.into(),
            children: Arc::new(children),
        }
    }

    /// The slot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn render_content(&self, ctx: &RenderContext<'_>, bound: &Value, parent: &mut dyn Respond) -> Result<String> {
        let mut buffer = StringRespond::new();
        self.children.render(ctx, bound, &mut buffer)?;
        for snippet in buffer.requires() {
            parent.require(snippet);
        }
        Ok(buffer.raw().to_string())
    }
}

impl Renderable for ArgumentWidget {
    // Arguments only render through the embed that owns them.
    fn render(&self, _ctx: &RenderContext<'_>, _bound: &Value, _respond: &mut dyn Respond) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Argument
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        let children: Arc<dyn Renderable> = self.children.clone();
        visit(&children);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Places an argument passed by the including page.
#[derive(Debug)]
pub struct IncludeWidget {
    name: String,
}

impl IncludeWidget {
    /// Creates an include point.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Renderable for IncludeWidget {
    fn render(&self, _ctx: &RenderContext<'_>, _bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        if let Some(content) = respond.include(&self.name).map(str::to_string) {
            respond.write(&content);
        }
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Include
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Renders another registered page in place.
#[derive(Debug)]
pub struct EmbedWidget {
    target: String,
    bindings: Vec<(String, String)>,
    children: Arc<WidgetChain>,
    arguments: Vec<Arc<dyn Renderable>>,
}

impl EmbedWidget {
    /// Creates an embed of the page registered as `target`.
    ///
    /// `bindings` maps target model properties to expressions evaluated
    /// against the including page's model. `@Argument` widgets anywhere
    /// under `children` become the embed's arguments.
    pub fn new(target: impl Into<String>, bindings: Vec<(String, String)>, children: WidgetChain) -> Self {
        let children = Arc::new(children);
        let root: Arc<dyn Renderable> = children.clone();
        let arguments = collect(&root, WidgetKind::Argument);
        Self {
            target: target.into(),
            bindings,
            children,
            arguments,
        }
    }

    /// The embed name of the target page.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Names of the arguments passed to the target.
    pub fn argument_names(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .filter_map(|widget| widget.as_any().downcast_ref::<ArgumentWidget>())
            .map(ArgumentWidget::name)
            .collect()
    }
}

impl Renderable for EmbedWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        let page = ctx.book.for_name(&self.target).ok_or_else(|| {
            PagewrightError::RenderError(format!("no page is embeddable as '{}'", self.target))
        })?;

        let mut instance = page.instantiate();
        for (property, source) in &self.bindings {
            let value = ctx.evaluate(source, bound)?;
            ctx.evaluator.write(property, &mut instance.model, value)?;
        }

        match page.do_method(&mut instance, ctx.request, ctx.event_parameter)? {
            Navigation::Stay => {}
            Navigation::Redirect(uri) => {
                respond.redirect(&uri);
                return Ok(());
            }
            other => {
                debug!(embed = %self.target, navigation = ?other, "Ignoring navigation from embedded page");
            }
        }

        let mut arguments = HashMap::new();
        for widget in &self.arguments {
            if let Some(argument) = widget.as_any().downcast_ref::<ArgumentWidget>() {
                let content = argument.render_content(ctx, bound, respond)?;
                arguments.insert(argument.name().to_string(), content);
            }
        }

        let mut embedded = EmbeddedRespond::with_arguments(StringRespond::new(), arguments);
        let embedded_ctx = ctx.for_class(instance.class.clone());
        page.render_page(&embedded_ctx, &instance.model, &mut embedded)?;
        embedded.splice_into(respond);
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Embed
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        let children: Arc<dyn Renderable> = self.children.clone();
        visit(&children);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::testing::Fixture;
    use crate::widget::{RawTextWidget, TextWidget};
    use serde_json::json;

    #[test]
    fn test_collects_nested_arguments() {
        let nested = WidgetChain::proceeding();
        nested
            .add_widget(Arc::new(ArgumentWidget::new("footer", WidgetChain::terminal())))
            .unwrap();

        let children = WidgetChain::proceeding();
        children
            .add_widget(Arc::new(ArgumentWidget::new("title", WidgetChain::terminal())))
            .unwrap();
        children.add_widget(Arc::new(nested)).unwrap();

        let embed = EmbedWidget::new("Card", vec![], children);
        assert_eq!(embed.argument_names(), vec!["title", "footer"]);
    }

    #[test]
    fn test_include_reads_arguments() {
        let fixture = Fixture::new();
        let include = IncludeWidget::new("title");

        let mut plain = StringRespond::new();
        include.render(&fixture.ctx(), &json!({}), &mut plain).unwrap();
        assert_eq!(plain.raw(), "");

        let mut embedded = EmbeddedRespond::with_arguments(
            StringRespond::new(),
            [("title".to_string(), "<h2>Hi</h2>".to_string())].into(),
        );
        include.render(&fixture.ctx(), &json!({}), &mut embedded).unwrap();
        assert_eq!(embedded.body(), "<h2>Hi</h2>");
    }

    #[test]
    fn test_argument_renders_against_including_model() {
        let fixture = Fixture::new();
        let argument = ArgumentWidget::new(
            "title",
            WidgetChain::singleton(Arc::new(TextWidget::parse("${heading}").unwrap())),
        );

        let mut parent = StringRespond::new();
        argument.render(&fixture.ctx(), &json!({ "heading": "Ann" }), &mut parent).unwrap();
        assert_eq!(parent.raw(), "");

        let content = argument
            .render_content(&fixture.ctx(), &json!({ "heading": "Ann" }), &mut parent)
            .unwrap();
        assert_eq!(content, "Ann");
    }

    #[test]
    fn test_unknown_target_is_a_render_error() {
        let fixture = Fixture::new();
        let embed = EmbedWidget::new(
            "Missing",
            vec![],
            WidgetChain::singleton(Arc::new(RawTextWidget::new("x"))),
        );
        let mut respond = StringRespond::new();
        assert!(matches!(
            embed.render(&fixture.ctx(), &json!({}), &mut respond),
            Err(PagewrightError::RenderError(_))
        ));
    }
}
