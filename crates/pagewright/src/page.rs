// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Registered pages and the page book.
//!
//! A [`Page`] binds a [`PageClass`] to a URI template (or an embed name), a
//! compiled widget tree and a handler table. The [`PageBook`] owns every
//! page and resolves request paths, embed names, classes and live instances
//! to them.
//!
//! # Lookup order
//!
//! Pages whose template starts with a literal segment are bucketed by that
//! segment; pages starting with a variable are "universal". [`PageBook::get`]
//! tries the request's bucket first, then the universal pages, each in
//! registration order. The first page whose matcher chain accepts the path
//! wins.

use crate::class::{Handler, Navigation, PageClass, PageInstance, Param};
use crate::error::{PagewrightError, Result};
use crate::matcher::{split_path, PathMatcher, PathMatcherChain};
use crate::request::Request;
use crate::respond::Respond;
use crate::widget::{RenderContext, Renderable};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::debug;

/// A page class registered in a [`PageBook`].
pub struct Page {
    uri: Option<String>,
    matcher: Option<PathMatcherChain>,
    class: Arc<PageClass>,
    embed_name: Option<String>,
    widget: OnceLock<Arc<dyn Renderable>>,
    methods: HashMap<String, Handler>,
}

impl Page {
    fn new(class: &Arc<PageClass>, uri: Option<&str>, embed_name: Option<&str>) -> Result<Self> {
        let matcher = uri.map(PathMatcherChain::compile).transpose()?;
        let methods = method_table(class)?;

        Ok(Self {
            uri: uri.map(str::to_string),
            matcher,
            class: class.clone(),
            embed_name: embed_name.map(str::to_string),
            widget: OnceLock::new(),
            methods,
        })
    }

    /// The URI template, if the page is addressable.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The compiled URI template.
    pub fn matcher(&self) -> Option<&PathMatcherChain> {
        self.matcher.as_ref()
    }

    /// The registered class.
    pub fn class(&self) -> &Arc<PageClass> {
        &self.class
    }

    /// The class name.
    pub fn name(&self) -> &str {
        self.class.name()
    }

    /// The embed name, for embeddable pages.
    pub fn embed_name(&self) -> Option<&str> {
        self.embed_name.as_deref()
    }

    /// True if the page renders no template.
    pub fn is_headless(&self) -> bool {
        self.class.is_headless()
    }

    /// True if a strict ancestor of the page's class is a decorating class.
    pub fn is_decorated(&self) -> bool {
        self.class.ancestry().iter().skip(1).any(|class| class.is_decorated())
    }

    /// The compiled widget tree, once compilation has finished.
    pub fn widget(&self) -> Option<&Arc<dyn Renderable>> {
        self.widget.get()
    }

    /// Installs the compiled widget tree. Returns false if one was already set.
    pub fn apply(&self, widget: Arc<dyn Renderable>) -> bool {
        self.widget.set(widget).is_ok()
    }

    /// Handler keys in the method table.
    pub fn method_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// A fresh instance of the page's class.
    pub fn instantiate(&self) -> PageInstance {
        self.class.instantiate()
    }

    /// Path variables captured from `path`, empty if the page has no template.
    pub fn path_variables(&self, path: &str) -> HashMap<String, String> {
        self.matcher
            .as_ref()
            .and_then(|matcher| matcher.find_matches(path))
            .unwrap_or_default()
    }

    /// Runs the handlers for the request's verb against `instance`.
    ///
    /// With an event parameter, each of its values selects the handler keyed
    /// `verb + value`, in request order; the first one that does not return
    /// [`Navigation::Stay`] ends the round. If no event handler ran, the plain
    /// verb handler runs. Without any handler the result is `Stay`.
    pub fn do_method(
        &self,
        instance: &mut PageInstance,
        request: &Request,
        event_parameter: Option<&str>,
    ) -> Result<Navigation> {
        let variables = self.path_variables(&request.path);
        let events = event_parameter.map(|name| request.params(name)).unwrap_or(&[]);

        let mut fired = false;
        for event in events {
            let key = format!("{}{}", request.method, event);
            if let Some(handler) = self.resolve(&instance.class, &key) {
                fired = true;
                let navigation = self.invoke(&handler, &key, instance, &variables)?;
                if !navigation.is_stay() {
                    debug!(page = self.name(), key = %key, "Event handler ended dispatch");
                    return Ok(navigation);
                }
            }
        }
        if fired {
            return Ok(Navigation::Stay);
        }

        match self.resolve(&instance.class, &request.method) {
            Some(handler) => self.invoke(&handler, &request.method, instance, &variables),
            None => Ok(Navigation::Stay),
        }
    }

    /// Renders `bound` with this page's template, through its decorating
    /// layouts if it has any. `ctx.class` is the class of the live instance.
    pub fn render_page(&self, ctx: &RenderContext<'_>, bound: &Value, respond: &mut dyn Respond) -> Result<()> {
        if self.is_headless() {
            return Ok(());
        }

        let outermost = ctx
            .class
            .ancestry()
            .into_iter()
            .skip(1)
            .rev()
            .filter(|class| class.is_decorated())
            .find_map(|class| {
                let widget = ctx.book.for_class(class.name())?.widget()?.clone();
                Some((class, widget))
            });

        match outermost {
            Some((layout, widget)) => widget.render(&ctx.with_cursor(layout), bound, respond),
            None => match self.widget() {
                Some(widget) => widget.render(&ctx.with_cursor(ctx.class.clone()), bound, respond),
                None => {
                    debug!(page = self.name(), "Page has no compiled template");
                    Ok(())
                }
            },
        }
    }

    // Subclass instances reached through `for_instance` use their own
    // handlers first, the registered class's table after.
    fn resolve(&self, class: &Arc<PageClass>, key: &str) -> Option<Handler> {
        if class.name() != self.class.name() {
            for ancestor in class.ancestry() {
                if ancestor.name() == self.class.name() {
                    break;
                }
                if let Some(handler) = ancestor.declared_handlers().iter().find(|h| h.key() == key) {
                    return Some(handler.clone());
                }
            }
        }
        self.methods.get(key).cloned()
    }

    fn invoke(
        &self,
        handler: &Handler,
        key: &str,
        instance: &mut PageInstance,
        variables: &HashMap<String, String>,
    ) -> Result<Navigation> {
        let args: Vec<Option<String>> = handler
            .params()
            .iter()
            .map(|param| match param {
                Param::Named(name) => variables.get(name).cloned(),
                Param::Unnamed => None,
            })
            .collect();

        handler
            .call(&mut instance.model, &args)
            .map_err(|source| PagewrightError::DispatchError {
                page: self.name().to_string(),
                method: key.to_string(),
                source,
            })
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("uri", &self.uri)
            .field("class", &self.class.name())
            .field("embed_name", &self.embed_name)
            .field("compiled", &self.widget.get().is_some())
            .field("methods", &self.method_keys())
            .finish()
    }
}

/// Declared handlers first, then inherited ones whose key is still free.
fn method_table(class: &Arc<PageClass>) -> Result<HashMap<String, Handler>> {
    let mut methods = HashMap::new();
    for ancestor in class.ancestry() {
        check_handlers(class, &ancestor)?;
        for handler in ancestor.declared_handlers() {
            methods.entry(handler.key()).or_insert_with(|| handler.clone());
        }
    }
    Ok(methods)
}

/// Every handler parameter must be named; `class` is the class being bound.
fn check_handlers(class: &PageClass, declaring: &PageClass) -> Result<()> {
    match declaring
        .declared_handlers()
        .iter()
        .find(|handler| handler.params().contains(&Param::Unnamed))
    {
        Some(handler) => Err(PagewrightError::registration(
            class.name(),
            format!(
                "handler {} declared on {} has a parameter without a name",
                handler.key(),
                declaring.name()
            ),
        )),
        None => Ok(()),
    }
}

/// A registered page bound to an existing instance.
///
/// Returned by [`PageBook::for_instance`]; instantiating it yields the live
/// instance rather than a fresh one.
#[derive(Debug, Clone)]
pub struct InstancePage {
    page: Arc<Page>,
    instance: PageInstance,
}

impl InstancePage {
    /// The registered page.
    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// The bound instance.
    pub fn instantiate(&self) -> PageInstance {
        self.instance.clone()
    }

    /// Splits into page and instance.
    pub fn into_parts(self) -> (Arc<Page>, PageInstance) {
        (self.page, self.instance)
    }
}

#[derive(Default)]
struct BookInner {
    by_head: HashMap<String, Vec<Arc<Page>>>,
    universal: Vec<Arc<Page>>,
    by_name: HashMap<String, Arc<Page>>,
    by_class: HashMap<String, Arc<Page>>,
    pages: Vec<Arc<Page>>,
}

/// The page registry.
#[derive(Default)]
pub struct PageBook {
    inner: RwLock<BookInner>,
    instances: RwLock<HashMap<String, Weak<Page>>>,
}

impl PageBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BookInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BookInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, page: Page) -> Result<Arc<Page>> {
        let page = Arc::new(page);
        let mut inner = self.write();

        if inner.by_class.contains_key(page.name()) {
            return Err(PagewrightError::registration(page.name(), "class is already registered"));
        }
        if let Some(name) = page.embed_name() {
            if inner.by_name.contains_key(name) {
                return Err(PagewrightError::registration(
                    page.name(),
                    format!("embed name '{}' is already taken", name),
                ));
            }
            inner.by_name.insert(name.to_string(), page.clone());
        }

        if let Some(matcher) = page.matcher() {
            match matcher.head() {
                Some(PathMatcher::Literal(head)) => {
                    inner.by_head.entry(head.clone()).or_default().push(page.clone())
                }
                _ => inner.universal.push(page.clone()),
            }
        }

        inner.by_class.insert(page.name().to_string(), page.clone());
        inner.pages.push(page.clone());
        Ok(page)
    }

    /// Registers `class` at a URI template.
    pub fn at(&self, uri: &str, class: &Arc<PageClass>) -> Result<Arc<Page>> {
        let page = self.insert(Page::new(class, Some(uri), None)?)?;
        debug!(uri, page = class.name(), "Registered page");
        Ok(page)
    }

    /// Registers `class` as an embeddable fragment under `name`.
    pub fn embed_as(&self, class: &Arc<PageClass>, name: &str) -> Result<Arc<Page>> {
        let page = self.insert(Page::new(class, None, Some(name))?)?;
        debug!(name, page = class.name(), "Registered embeddable page");
        Ok(page)
    }

    /// Registers a class that is only reachable through its subclasses,
    /// typically a decorating layout.
    pub fn decorate(&self, class: &Arc<PageClass>) -> Result<Arc<Page>> {
        let page = self.insert(Page::new(class, None, None)?)?;
        debug!(page = class.name(), "Registered layout page");
        Ok(page)
    }

    /// The first page whose URI template matches `path`.
    pub fn get(&self, path: &str) -> Option<Arc<Page>> {
        let inner = self.read();
        let head = split_path(path).into_iter().find(|segment| !segment.is_empty());

        let bucket = head
            .and_then(|head| inner.by_head.get(head))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        bucket
            .iter()
            .chain(inner.universal.iter())
            .find(|page| page.matcher().is_some_and(|matcher| matcher.matches(path)))
            .cloned()
    }

    /// The page embeddable as `name`.
    pub fn for_name(&self, name: &str) -> Option<Arc<Page>> {
        self.read().by_name.get(name).cloned()
    }

    /// The page registered for exactly this class.
    pub fn for_class(&self, class_name: &str) -> Option<Arc<Page>> {
        self.read().by_class.get(class_name).cloned()
    }

    /// The page registered for the instance's class or its nearest
    /// registered ancestor, bound to the instance.
    ///
    /// The first lookup for an unregistered subclass binds it to that
    /// ancestor, and its own handlers are validated like a registration.
    pub fn for_instance(&self, instance: &PageInstance) -> Result<Option<InstancePage>> {
        let cached = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(instance.class_name())
            .and_then(Weak::upgrade);

        let page = match cached {
            Some(page) => page,
            None => {
                let ancestry = instance.class.ancestry();
                let Some(page) = ancestry.iter().find_map(|class| self.for_class(class.name())) else {
                    return Ok(None);
                };
                for class in ancestry.iter().take_while(|class| class.name() != page.name()) {
                    check_handlers(&instance.class, class)?;
                }
                self.instances
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(instance.class_name().to_string(), Arc::downgrade(&page));
                page
            }
        };

        Ok(Some(InstancePage {
            page,
            instance: instance.clone(),
        }))
    }

    /// Every registered page, in registration order.
    pub fn pages(&self) -> Vec<Arc<Page>> {
        self.read().pages.clone()
    }

    /// Number of registered pages.
    pub fn len(&self) -> usize {
        self.read().pages.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PageBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBook").field("pages", &self.read().pages).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Handler;
    use serde_json::json;
    use std::sync::Mutex;

    fn class(name: &str) -> Arc<PageClass> {
        PageClass::builder(name).build()
    }

    #[test]
    fn test_users_scenario() {
        let book = PageBook::new();
        book.at("/users/:id", &class("UserPage")).unwrap();

        let page = book.get("/users/42").expect("page");
        assert_eq!(page.name(), "UserPage");
        assert_eq!(page.path_variables("/users/42").get("id").map(String::as_str), Some("42"));
        assert!(book.get("/users/42/extra").is_none());
        assert!(book.get("/users").is_none());
    }

    #[test]
    fn test_static_bucket_before_universal() {
        let book = PageBook::new();
        book.at("/:section", &class("Section")).unwrap();
        book.at("/about", &class("About")).unwrap();

        assert_eq!(book.get("/about").unwrap().name(), "About");
        assert_eq!(book.get("/blog").unwrap().name(), "Section");
    }

    #[test]
    fn test_first_registered_wins_within_bucket() {
        let book = PageBook::new();
        book.at("/items/:id{\\d+}", &class("ItemById")).unwrap();
        book.at("/items/:slug", &class("ItemBySlug")).unwrap();
        book.at("/items/:other", &class("Never")).unwrap();

        assert_eq!(book.get("/items/7").unwrap().name(), "ItemById");
        assert_eq!(book.get("/items/seven").unwrap().name(), "ItemBySlug");
    }

    #[test]
    fn test_root_page() {
        let book = PageBook::new();
        book.at("/", &class("Home")).unwrap();
        assert_eq!(book.get("/").unwrap().name(), "Home");
        assert!(book.get("/x").is_none());
    }

    #[test]
    fn test_embed_and_class_lookup() {
        let book = PageBook::new();
        book.embed_as(&class("Card"), "Card").unwrap();

        assert_eq!(book.for_name("Card").unwrap().uri(), None);
        assert!(book.for_class("Card").is_some());
        assert!(book.for_name("Missing").is_none());
        assert!(book.get("/Card").is_none());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let book = PageBook::new();
        let home = class("Home");
        book.at("/", &home).unwrap();
        assert!(book.at("/home", &home).is_err());

        book.embed_as(&class("A"), "Widget").unwrap();
        assert!(book.embed_as(&class("B"), "Widget").is_err());
    }

    #[test]
    fn test_unnamed_handler_param_fails_registration() {
        let book = PageBook::new();
        let bad = PageClass::builder("Bad")
            .handler(Handler::new("GET", |_, _| Ok(Navigation::Stay)).unnamed_param())
            .build();
        assert!(matches!(
            book.at("/bad", &bad),
            Err(PagewrightError::RegistrationError { .. })
        ));
    }

    #[test]
    fn test_for_instance_falls_back_to_registered_ancestor() {
        let book = PageBook::new();
        let base = PageClass::builder("A").model(json!({ "n": 0 })).build();
        let sub = PageClass::builder("B").extends(&base).build();
        book.at("/a", &base).unwrap();

        let live = PageInstance::new(&sub, json!({ "n": 5 }));
        let found = book.for_instance(&live).unwrap().expect("ancestor page");
        assert_eq!(found.page().name(), "A");

        let instance = found.instantiate();
        assert_eq!(instance.class_name(), "B");
        assert_eq!(instance.model["n"], 5);

        // second lookup is served from the instance cache
        assert_eq!(book.for_instance(&live).unwrap().unwrap().page().name(), "A");

        let stranger = PageInstance::new(&class("Stranger"), json!({}));
        assert!(book.for_instance(&stranger).unwrap().is_none());
    }

    #[test]
    fn test_unnamed_param_on_unregistered_subclass_is_rejected() {
        let book = PageBook::new();
        let base = PageClass::builder("A").build();
        let sub = PageClass::builder("B")
            .extends(&base)
            .handler(
                Handler::new("GET", |m, args| {
                    m["arg"] = json!(format!("{:?}", args));
                    Ok(Navigation::Stay)
                })
                .unnamed_param(),
            )
            .build();
        book.at("/a", &base).unwrap();

        let live = PageInstance::new(&sub, json!({}));
        let err = book.for_instance(&live).unwrap_err();
        match err {
            PagewrightError::RegistrationError { page, message } => {
                assert_eq!(page, "B");
                assert!(message.contains("declared on B"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        // a failed lookup is not cached
        assert!(book.for_instance(&live).is_err());
    }

    #[test]
    fn test_widget_is_write_once() {
        let book = PageBook::new();
        let page = book.at("/", &class("Home")).unwrap();
        assert!(page.widget().is_none());

        assert!(page.apply(Arc::new(crate::widget::RawTextWidget::new("a"))));
        assert!(!page.apply(Arc::new(crate::widget::RawTextWidget::new("b"))));
        assert!(page.widget().is_some());
    }

    #[test]
    fn test_declared_handlers_override_inherited() {
        let base = PageClass::builder("Base")
            .handler(Handler::new("GET", |m, _| {
                m["by"] = json!("base");
                Ok(Navigation::Stay)
            }))
            .handler(Handler::new("POST", |m, _| {
                m["posted"] = json!(true);
                Ok(Navigation::Stay)
            }))
            .build();
        let leaf = PageClass::builder("Leaf")
            .extends(&base)
            .handler(Handler::new("GET", |m, _| {
                m["by"] = json!("leaf");
                Ok(Navigation::Stay)
            }))
            .build();

        let book = PageBook::new();
        let page = book.at("/leaf", &leaf).unwrap();
        assert_eq!(page.method_keys(), vec!["GET", "POST"]);

        let mut instance = page.instantiate();
        page.do_method(&mut instance, &Request::new("/leaf", "GET"), None).unwrap();
        assert_eq!(instance.model["by"], "leaf");
        page.do_method(&mut instance, &Request::new("/leaf", "POST"), None).unwrap();
        assert_eq!(instance.model["posted"], true);
    }

    #[test]
    fn test_handler_arguments_from_path_variables() {
        let page_class = PageClass::builder("Post")
            .handler(
                Handler::new("GET", |m, args| {
                    m["year"] = json!(args[0]);
                    m["slug"] = json!(args[1]);
                    m["none"] = json!(args[2]);
                    Ok(Navigation::Stay)
                })
                .param("year")
                .param("slug")
                .param("absent"),
            )
            .build();

        let book = PageBook::new();
        let page = book.at("/posts/:year{\\d{4}}/:slug", &page_class).unwrap();
        let mut instance = page.instantiate();
        page.do_method(&mut instance, &Request::new("/posts/2024/hello", "GET"), None)
            .unwrap();

        assert_eq!(instance.model, json!({ "year": "2024", "slug": "hello", "none": null }));
    }

    #[test]
    fn test_event_discriminator() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());

        let todo = PageClass::builder("Todo")
            .handler(Handler::new("POST", move |_, _| {
                a.lock().unwrap().push("default");
                Ok(Navigation::Stay)
            }))
            .handler(
                Handler::new("POST", move |_, _| {
                    b.lock().unwrap().push("save");
                    Ok(Navigation::Stay)
                })
                .on_event("save"),
            )
            .handler(
                Handler::new("POST", move |_, _| {
                    c.lock().unwrap().push("delete");
                    Ok(Navigation::Redirect("/todos".into()))
                })
                .on_event("delete"),
            )
            .build();

        let book = PageBook::new();
        let page = book.at("/todo", &todo).unwrap();
        let mut instance = page.instantiate();

        let request = Request::new("/todo", "POST").with_query_string("event=save");
        page.do_method(&mut instance, &request, Some("event")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["save"]);

        log.lock().unwrap().clear();
        let request = Request::new("/todo", "POST").with_query_string("event=unknown");
        page.do_method(&mut instance, &request, Some("event")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["default"]);

        log.lock().unwrap().clear();
        let request = Request::new("/todo", "POST").with_query_string("event=delete&event=save");
        let navigation = page.do_method(&mut instance, &request, Some("event")).unwrap();
        assert!(matches!(navigation, Navigation::Redirect(uri) if uri == "/todos"));
        assert_eq!(*log.lock().unwrap(), vec!["delete"]);

        // parameter disabled: the event is ignored
        log.lock().unwrap().clear();
        let request = Request::new("/todo", "POST").with_query_string("event=save");
        page.do_method(&mut instance, &request, None).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["default"]);
    }

    #[test]
    fn test_handler_failure_becomes_dispatch_error() {
        let broken = PageClass::builder("Broken")
            .handler(Handler::new("GET", |_, _| Err("database unavailable".into())))
            .build();
        let book = PageBook::new();
        let page = book.at("/broken", &broken).unwrap();

        let mut instance = page.instantiate();
        let err = page
            .do_method(&mut instance, &Request::new("/broken", "GET"), None)
            .unwrap_err();
        match err {
            PagewrightError::DispatchError { page, method, source } => {
                assert_eq!(page, "Broken");
                assert_eq!(method, "GET");
                assert_eq!(source.to_string(), "database unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_handler_stays() {
        let book = PageBook::new();
        let page = book.at("/plain", &class("Plain")).unwrap();
        let mut instance = page.instantiate();
        let navigation = page
            .do_method(&mut instance, &Request::new("/plain", "DELETE"), None)
            .unwrap();
        assert!(navigation.is_stay());
    }
}
