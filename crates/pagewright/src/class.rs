// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page classes, handlers and live page instances.
//!
//! A [`PageClass`] describes a kind of page: its model factory, the template
//! it renders, its parent class (for handler inheritance, `for_instance`
//! lookups and template decoration) and its event handlers.
//!
//! Handlers are typed closures registered under an HTTP verb and an optional
//! event name. Their arguments are declared as [`Param`]s and resolved by
//! name against the variables captured from the request path.
//!
//! ```rust
//! use pagewright::{Handler, Navigation, PageClass};
//! use serde_json::json;
//!
//! let user = PageClass::builder("UserPage")
//!     .model(json!({ "id": null }))
//!     .handler(Handler::new("GET", |model, args| {
//!         model["id"] = json!(args[0]);
//!         Ok(Navigation::Stay)
//!     }).param("id"))
//!     .build();
//! assert_eq!(user.name(), "UserPage");
//! ```

use crate::error::BoxError;
use crate::response::PageResponse;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Handler signature: mutable page model plus positional arguments.
pub type HandlerFn =
    Arc<dyn Fn(&mut Value, &[Option<String>]) -> Result<Navigation, BoxError> + Send + Sync>;

/// Model factory used to instantiate a class.
pub type ModelFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// What a handler asks the dispatcher to do next.
#[derive(Debug, Clone)]
pub enum Navigation {
    /// Render the current page.
    Stay,
    /// Redirect to a URI.
    Redirect(String),
    /// Redirect to another live page instance (page chaining).
    Page(PageInstance),
    /// Send this response instead of rendering.
    Reply(PageResponse),
}

impl Navigation {
    /// Returns true for [`Navigation::Stay`].
    pub fn is_stay(&self) -> bool {
        matches!(self, Navigation::Stay)
    }
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Resolved from the path variable with this name.
    Named(String),
    /// A parameter with no name; rejected when the page is registered.
    Unnamed,
}

/// An event handler declared on a page class.
#[derive(Clone)]
pub struct Handler {
    verb: String,
    event: Option<String>,
    params: Vec<Param>,
    func: HandlerFn,
}

impl Handler {
    /// Creates a handler for the given HTTP verb.
    pub fn new<F>(verb: &str, func: F) -> Self
    where
        F: Fn(&mut Value, &[Option<String>]) -> Result<Navigation, BoxError> + Send + Sync + 'static,
    {
        Self {
            verb: verb.to_uppercase(),
            event: None,
            params: Vec::new(),
            func: Arc::new(func),
        }
    }

    /// Restricts the handler to one value of the event discriminator.
    pub fn on_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Declares the next positional argument, resolved from a path variable.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::Named(name.into()));
        self
    }

    /// Declares a positional argument with no name.
    pub fn unnamed_param(mut self) -> Self {
        self.params.push(Param::Unnamed);
        self
    }

    /// The upper-case HTTP verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The event discriminator value, if any.
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The dispatch key: verb followed by the event name.
    pub fn key(&self) -> String {
        format!("{}{}", self.verb, self.event.as_deref().unwrap_or(""))
    }

    /// Calls the handler.
    pub fn call(&self, model: &mut Value, args: &[Option<String>]) -> Result<Navigation, BoxError> {
        (self.func)(model, args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("verb", &self.verb)
            .field("event", &self.event)
            .field("params", &self.params)
            .finish()
    }
}

/// Describes one kind of page.
pub struct PageClass {
    name: String,
    parent: Option<Arc<PageClass>>,
    decorated: bool,
    headless: bool,
    template: Option<String>,
    factory: ModelFactory,
    handlers: Vec<Handler>,
}

impl PageClass {
    /// Starts building a class.
    pub fn builder(name: impl Into<String>) -> PageClassBuilder {
        PageClassBuilder {
            name: name.into(),
            parent: None,
            decorated: false,
            headless: false,
            template: None,
            factory: None,
            handlers: Vec::new(),
        }
    }

    /// Class name, unique within an application.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent class, if any.
    pub fn parent(&self) -> Option<&Arc<PageClass>> {
        self.parent.as_ref()
    }

    /// True if this class's template decorates its subclasses' templates.
    pub fn is_decorated(&self) -> bool {
        self.decorated
    }

    /// True if this class renders no template.
    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Template name to load, defaulting to `<Name>.html`.
    pub fn template_name(&self) -> Option<String> {
        if self.headless {
            return None;
        }
        Some(
            self.template
                .clone()
                .unwrap_or_else(|| format!("{}.html", self.name)),
        )
    }

    /// Handlers declared directly on this class.
    pub fn declared_handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// This class followed by its ancestors, nearest first.
    pub fn ancestry(self: &Arc<Self>) -> Vec<Arc<PageClass>> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent.clone();
        while let Some(class) = current {
            current = class.parent.clone();
            chain.push(class);
        }
        chain
    }

    /// True if `name` is this class or one of its ancestors.
    pub fn is_a(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.name == name {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }

    /// Creates a fresh instance with the factory's model.
    pub fn instantiate(self: &Arc<Self>) -> PageInstance {
        PageInstance {
            class: self.clone(),
            model: (self.factory)(),
        }
    }
}

impl fmt::Debug for PageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageClass")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("decorated", &self.decorated)
            .field("headless", &self.headless)
            .finish()
    }
}

/// Builder for [`PageClass`].
pub struct PageClassBuilder {
    name: String,
    parent: Option<Arc<PageClass>>,
    decorated: bool,
    headless: bool,
    template: Option<String>,
    factory: Option<ModelFactory>,
    handlers: Vec<Handler>,
}

impl PageClassBuilder {
    /// Sets the parent class. The factory defaults to the parent's.
    pub fn extends(mut self, parent: &Arc<PageClass>) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Marks the class as a decorating (layout) class.
    pub fn decorated(mut self) -> Self {
        self.decorated = true;
        self
    }

    /// Marks the class as headless: handlers only, no template.
    pub fn headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Overrides the template name.
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Every instance starts as a clone of `model`.
    pub fn model(mut self, model: Value) -> Self {
        self.factory = Some(Arc::new(move || model.clone()));
        self
    }

    /// Every instance starts with the factory's output.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Declares a handler.
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Finishes the class.
    pub fn build(self) -> Arc<PageClass> {
        let factory = match (self.factory, &self.parent) {
            (Some(factory), _) => factory,
            (None, Some(parent)) => parent.factory.clone(),
            (None, None) => Arc::new(|| Value::Object(Default::default())),
        };

        Arc::new(PageClass {
            name: self.name,
            parent: self.parent,
            decorated: self.decorated,
            headless: self.headless,
            template: self.template,
            factory,
            handlers: self.handlers,
        })
    }
}

/// A live page object: its class and its model.
#[derive(Debug, Clone)]
pub struct PageInstance {
    /// The class this instance was created from.
    pub class: Arc<PageClass>,
    /// The bound model.
    pub model: Value,
}

impl PageInstance {
    /// Creates an instance of `class` with an explicit model.
    pub fn new(class: &Arc<PageClass>, model: Value) -> Self {
        Self {
            class: class.clone(),
            model,
        }
    }

    /// Name of the instance's class.
    pub fn class_name(&self) -> &str {
        self.class.name()
    }
}
