// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Element serialization.
//!
//! Attribute values are tokenized once at compile time and re-evaluated on
//! every render. Root-relative values of the [`CONTEXTUAL_ATTRIBUTES`] get the
//! request's context path prepended, so templates can link to `/users`
//! regardless of where the application is mounted.

use super::text::{render_tokens, TextToken};
use super::{RenderContext, Renderable, WidgetChain, WidgetKind};
use crate::error::Result;
use crate::respond::{Respond, HEADER_PLACEHOLDER};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Attributes whose root-relative values are prefixed with the context path.
pub const CONTEXTUAL_ATTRIBUTES: [&str; 3] = ["href", "action", "src"];

/// A compiled attribute: name plus value tokens (`None` for bare attributes).
pub type Attribute = (String, Option<Vec<TextToken>>);

/// How an element is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closing {
    /// `<p>...</p>`
    Normal,
    /// `<br>`
    Void,
    /// `<path/>`
    SelfClosing,
}

fn contextualize(name: &str, value: String, ctx: &RenderContext<'_>) -> String {
    let root_relative = value.starts_with('/') && !value.starts_with("//");
    if root_relative && CONTEXTUAL_ATTRIBUTES.contains(&name.to_ascii_lowercase().as_str()) {
        format!("{}{}", ctx.context_path(), value)
    } else {
        value
    }
}

fn write_open_tag(
    tag: &str,
    attributes: &[Attribute],
    ctx: &RenderContext<'_>,
    bound: &Value,
    out: &mut String,
) -> Result<()> {
    out.push('<');
    out.push_str(tag);
    for (name, tokens) in attributes {
        out.push(' ');
        out.push_str(name);
        if let Some(tokens) = tokens {
            let value = contextualize(name, render_tokens(tokens, ctx, bound)?, ctx);
            out.push_str("=\"");
            out.push_str(&value);
            out.push('"');
        }
    }
    Ok(())
}

/// An element with evaluated attributes and a child chain.
#[derive(Debug)]
pub struct XmlWidget {
    tag: String,
    attributes: Vec<Attribute>,
    children: Arc<WidgetChain>,
    closing: Closing,
}

impl XmlWidget {
    /// Creates an element widget.
    pub fn new(tag: impl Into<String>, attributes: Vec<Attribute>, children: WidgetChain, closing: Closing) -> Self {
        Self {
            tag: tag.into(),
            attributes,
            children: Arc::new(children),
            closing,
        }
    }

    /// The tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The children.
    pub fn children(&self) -> &Arc<WidgetChain> {
        &self.children
    }
}

impl Renderable for XmlWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        let mut open = String::new();
        write_open_tag(&self.tag, &self.attributes, ctx, bound, &mut open)?;

        match self.closing {
            Closing::Void => {
                open.push('>');
                respond.write(&open);
            }
            Closing::SelfClosing => {
                open.push_str("/>");
                respond.write(&open);
            }
            Closing::Normal => {
                open.push('>');
                respond.write(&open);
                self.children.render(ctx, bound, respond)?;
                respond.write(&format!("</{}>", self.tag));
            }
        }
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Xml
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&Arc<dyn Renderable>)) {
        let children: Arc<dyn Renderable> = self.children.clone();
        visit(&children);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The document `<head>`. Marks where head content and requires are placed.
#[derive(Debug)]
pub struct HeaderWidget {
    attributes: Vec<Attribute>,
    children: Arc<WidgetChain>,
}

impl HeaderWidget {
    /// Creates a head widget.
    pub fn new(attributes: Vec<Attribute>, children: WidgetChain) -> Self {
        Self {
            attributes,
            children: Arc::new(children),
        }
    }
}

impl Renderable for HeaderWidget {
    fn render(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        let mut open = String::new();
        write_open_tag("head", &self.attributes, ctx, bound, &mut open)?;
        open.push('>');
        respond.write(&open);
        self.children.render(ctx, bound, respond)?;
        respond.write(HEADER_PLACEHOLDER);
        respond.write("</head>");
        Ok(())
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Header
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
    use crate::request::Request;
    use crate::respond::StringRespond;
    use crate::widget::testing::Fixture;
    use crate::widget::{tokenize, RawTextWidget};
    use serde_json::json;

    fn attr(name: &str, value: &str) -> Attribute {
        (name.to_string(), Some(tokenize(value).unwrap()))
    }

    fn render(widget: &dyn Renderable, fixture: &Fixture, bound: Value) -> String {
        let mut respond = StringRespond::new();
        widget.render(&fixture.ctx(), &bound, &mut respond).unwrap();
        respond.body()
    }

    #[test]
    fn test_element_with_children() {
        let fixture = Fixture::new();
        let children = WidgetChain::proceeding();
        children.add_widget(Arc::new(RawTextWidget::new("hi"))).unwrap();
        let widget = XmlWidget::new("p", vec![attr("class", "${cls}")], children, Closing::Normal);

        assert_eq!(render(&widget, &fixture, json!({ "cls": "lead" })), "<p class=\"lead\">hi</p>");
    }

    #[test]
    fn test_void_and_self_closing() {
        let fixture = Fixture::new();
        let br = XmlWidget::new("br", vec![], WidgetChain::terminal(), Closing::Void);
        let input = XmlWidget::new(
            "input",
            vec![("disabled".to_string(), None)],
            WidgetChain::terminal(),
            Closing::SelfClosing,
        );
        assert_eq!(render(&br, &fixture, json!({})), "<br>");
        assert_eq!(render(&input, &fixture, json!({})), "<input disabled/>");
    }

    #[test]
    fn test_contextual_attributes_get_context_path() {
        let mut fixture = Fixture::new();
        fixture.request = Request::new("/", "GET").with_context_path("/app");

        let link = XmlWidget::new(
            "a",
            vec![attr("href", "/users/${id}"), attr("title", "/not/a/link")],
            WidgetChain::terminal(),
            Closing::Normal,
        );
        assert_eq!(
            render(&link, &fixture, json!({ "id": 7 })),
            "<a href=\"/app/users/7\" title=\"/not/a/link\"></a>"
        );

        let cdn = XmlWidget::new("script", vec![attr("src", "//cdn.example.com/x.js")], WidgetChain::terminal(), Closing::Normal);
        assert_eq!(render(&cdn, &fixture, json!({})), "<script src=\"//cdn.example.com/x.js\"></script>");

        let relative = XmlWidget::new("form", vec![attr("action", "save")], WidgetChain::terminal(), Closing::Normal);
        assert_eq!(render(&relative, &fixture, json!({})), "<form action=\"save\"></form>");
    }

    #[test]
    fn test_header_places_requires_and_head() {
        let fixture = Fixture::new();
        let children = WidgetChain::proceeding();
        children.add_widget(Arc::new(RawTextWidget::new("<title>t</title>"))).unwrap();
        let head = HeaderWidget::new(vec![], children);

        let mut respond = StringRespond::new();
        head.render(&fixture.ctx(), &json!({}), &mut respond).unwrap();
        respond.require("<script src=\"/a.js\"></script>");
        respond.write_to_head("<meta charset=\"utf-8\">");

        assert_eq!(
            respond.body(),
            "<head><title>t</title><script src=\"/a.js\"></script><meta charset=\"utf-8\"></head>"
        );
    }
}
