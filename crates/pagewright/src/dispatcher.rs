// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Request dispatch.
//!
//! [`WidgetRoutingDispatcher`] turns a [`Request`] into a [`PageResponse`]:
//!
//! 1. a registered static resource at the exact path is served directly;
//! 2. otherwise the page is a chained page waiting in the flash cache, or
//!    the first page in the book whose URI template matches;
//! 3. request parameters are bound onto a fresh (or chained) instance;
//! 4. the page's handlers run for the request verb and event;
//! 5. the handler's [`Navigation`] decides between redirecting, chaining to
//!    another page, replying directly, or rendering the page.
//!
//! No matching page is `Ok(None)`, leaving the fallback to the caller.

use crate::bind::RequestBinder;
use crate::class::{Navigation, PageInstance};
use crate::error::{PagewrightError, Result};
use crate::evaluator::Evaluator;
use crate::flash::{flash_key, FlashCache, FlashEntry, FLASH_COOKIE};
use crate::page::{Page, PageBook};
use crate::request::Request;
use crate::resources::ResourceBook;
use crate::respond::{Respond, StringRespond};
use crate::response::PageResponse;
use crate::widget::RenderContext;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Dispatch settings.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Request parameter selecting event handlers; disabled when `None`.
    pub event_parameter: Option<String>,
    /// Deployment prefix, used when the request does not carry one.
    pub context_path: String,
}

impl DispatchConfig {
    /// Default settings: no event parameter, mounted at root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the event discriminator parameter.
    pub fn with_event_parameter(mut self, name: impl Into<String>) -> Self {
        self.event_parameter = Some(name.into());
        self
    }

    /// Sets the context path.
    pub fn with_context_path(mut self, path: impl Into<String>) -> Self {
        self.context_path = path.into().trim_end_matches('/').to_string();
        self
    }
}

/// Routes a request to a response.
pub trait RoutingDispatcher: Send + Sync {
    /// Returns `Ok(None)` when nothing handles the request.
    fn dispatch(&self, request: &Request) -> Result<Option<PageResponse>>;
}

/// The page dispatcher.
pub struct WidgetRoutingDispatcher {
    book: Arc<PageBook>,
    resources: Arc<ResourceBook>,
    evaluator: Arc<dyn Evaluator>,
    binder: Arc<dyn RequestBinder>,
    flash: Arc<dyn FlashCache>,
    config: DispatchConfig,
}

impl WidgetRoutingDispatcher {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(
        book: Arc<PageBook>,
        resources: Arc<ResourceBook>,
        evaluator: Arc<dyn Evaluator>,
        binder: Arc<dyn RequestBinder>,
        flash: Arc<dyn FlashCache>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            book,
            resources,
            evaluator,
            binder,
            flash,
            config,
        }
    }

    /// The dispatch settings.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn contextualize<'r>(&self, request: &'r Request) -> Cow<'r, Request> {
        if request.context_path.is_empty() && !self.config.context_path.is_empty() {
            Cow::Owned(request.clone().with_context_path(self.config.context_path.clone()))
        } else {
            Cow::Borrowed(request)
        }
    }

    /// Prefixes root-relative locations with the context path.
    fn location(request: &Request, uri: &str) -> String {
        if uri.starts_with('/') && !uri.starts_with("//") {
            format!("{}{}", request.context_path, uri)
        } else {
            uri.to_string()
        }
    }

    fn chain(&self, request: &Request, conversation: Option<&str>, target: PageInstance) -> Result<PageResponse> {
        let (page, instance) = self
            .book
            .for_instance(&target)?
            .ok_or_else(|| {
                PagewrightError::RenderError(format!("no page is registered for {}", target.class_name()))
            })?
            .into_parts();

        let uri = match page.matcher() {
            Some(matcher) if matcher.variable_names().is_empty() => matcher.template().to_string(),
            Some(_) => {
                return Err(PagewrightError::RenderError(format!(
                    "cannot chain to {}: its URI has variables",
                    page.name()
                )))
            }
            None => {
                return Err(PagewrightError::RenderError(format!(
                    "cannot chain to {}: it has no URI",
                    page.name()
                )))
            }
        };

        debug!(from = %request.path, to = %uri, page = page.name(), "Chaining to page");
        self.flash
            .put(&flash_key(conversation, &uri), FlashEntry { page, instance })?;
        Ok(PageResponse::redirect(Self::location(request, &uri)))
    }

    fn render(
        &self,
        request: &Request,
        page: &Page,
        instance: &PageInstance,
        errors: Vec<String>,
    ) -> Result<PageResponse> {
        if page.is_headless() {
            return Ok(PageResponse::html(200, ""));
        }

        let ctx = RenderContext::new(&self.book, self.evaluator.as_ref(), request, instance.class.clone())
            .with_event_parameter(self.config.event_parameter.as_deref());

        let mut respond = StringRespond::new();
        for error in errors {
            respond.add_error(error);
        }
        page.render_page(&ctx, &instance.model, &mut respond)?;

        if let Some(target) = respond.redirect_target() {
            return Ok(PageResponse::redirect(Self::location(request, target)));
        }
        Ok(PageResponse::html(200, respond.body()).with_header("Content-Type", "text/html; charset=utf-8"))
    }
}

impl RoutingDispatcher for WidgetRoutingDispatcher {
    fn dispatch(&self, request: &Request) -> Result<Option<PageResponse>> {
        let request = self.contextualize(request);

        if let Some(response) = self.resources.serve(&request) {
            debug!(path = %request.path, status = response.status(), "Served resource");
            return Ok(Some(response));
        }

        let conversation = request.cookies.get(FLASH_COOKIE).map(String::as_str);
        let (page, mut instance) = match self.flash.remove(&flash_key(conversation, &request.path))? {
            Some(entry) => {
                debug!(path = %request.path, page = entry.page.name(), "Resuming chained page");
                (entry.page, entry.instance)
            }
            None => match self.book.get(&request.path) {
                Some(page) => {
                    let instance = page.instantiate();
                    (page, instance)
                }
                None => {
                    debug!(path = %request.path, "No page matched");
                    return Ok(None);
                }
            },
        };

        let errors = self.binder.bind(&request, &mut instance, self.evaluator.as_ref());
        if !errors.is_empty() {
            debug!(page = page.name(), errors = errors.len(), "Request binding reported errors");
        }

        let navigation = page.do_method(&mut instance, &request, self.config.event_parameter.as_deref())?;
        debug!(method = %request.method, path = %request.path, page = page.name(), "Dispatched");

        let response = match navigation {
            Navigation::Stay => self.render(&request, &page, &instance, errors)?,
            Navigation::Redirect(uri) => PageResponse::redirect(Self::location(&request, &uri)),
            Navigation::Page(target) => self.chain(&request, conversation, target)?,
            Navigation::Reply(response) => response,
        };
        Ok(Some(response))
    }
}

impl fmt::Debug for WidgetRoutingDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRoutingDispatcher")
            .field("pages", &self.book.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::PropertyBinder;
    use crate::class::{Handler, PageClass};
    use crate::evaluator::PathEvaluator;
    use crate::flash::MemoryFlashCache;
    use crate::resources::Resource;
    use crate::widget::TextWidget;
    use serde_json::json;

    fn dispatcher(book: PageBook, config: DispatchConfig) -> WidgetRoutingDispatcher {
        let resources = ResourceBook::new();
        resources.at("/robots.txt", Resource::new("text/plain", "User-agent: *"));
        WidgetRoutingDispatcher::new(
            Arc::new(book),
            Arc::new(resources),
            Arc::new(PathEvaluator::new()),
            Arc::new(PropertyBinder::new().skipping("event")),
            Arc::new(MemoryFlashCache::default()),
            config,
        )
    }

    #[test]
    fn test_resources_win_and_unknown_paths_are_none() {
        let dispatcher = dispatcher(PageBook::new(), DispatchConfig::new());
        let response = dispatcher.dispatch(&Request::new("/robots.txt", "GET")).unwrap();
        assert!(matches!(response, Some(PageResponse::Asset { status: 200, .. })));
        assert!(dispatcher.dispatch(&Request::new("/nothing", "GET")).unwrap().is_none());
    }

    #[test]
    fn test_renders_bound_page() {
        let book = PageBook::new();
        let class = PageClass::builder("Hello").model(json!({ "name": "" })).build();
        let page = book.at("/hello", &class).unwrap();
        page.apply(Arc::new(TextWidget::parse("Hello ${name}").unwrap()));

        let dispatcher = dispatcher(book, DispatchConfig::new());
        let response = dispatcher
            .dispatch(&Request::new("/hello", "GET").with_query_string("name=Ann"))
            .unwrap()
            .unwrap();
        assert_eq!(response.html_body(), Some("Hello Ann"));
    }

    #[test]
    fn test_redirect_gets_context_path() {
        let book = PageBook::new();
        let class = PageClass::builder("Old")
            .handler(Handler::new("GET", |_, _| Ok(Navigation::Redirect("/new".into()))))
            .build();
        book.at("/old", &class).unwrap();

        let dispatcher = dispatcher(book, DispatchConfig::new().with_context_path("/app/"));
        let response = dispatcher.dispatch(&Request::new("/old", "GET")).unwrap().unwrap();
        assert_eq!(response, PageResponse::redirect("/app/new"));
    }

    #[test]
    fn test_headless_reply() {
        let book = PageBook::new();
        let api = PageClass::builder("Api")
            .headless()
            .handler(Handler::new("GET", |_, _| {
                Ok(Navigation::Reply(PageResponse::json(200, json!({ "ok": true }))))
            }))
            .build();
        book.at("/api", &api).unwrap();

        let dispatcher = dispatcher(book, DispatchConfig::new());
        let response = dispatcher.dispatch(&Request::new("/api", "GET")).unwrap().unwrap();
        assert_eq!(response, PageResponse::json(200, json!({ "ok": true })));

        let response = dispatcher.dispatch(&Request::new("/api", "POST")).unwrap().unwrap();
        assert_eq!(response.html_body(), Some(""));
    }

    #[test]
    fn test_handler_errors_propagate() {
        let book = PageBook::new();
        let class = PageClass::builder("Fails")
            .handler(Handler::new("GET", |_, _| Err("boom".into())))
            .build();
        book.at("/fails", &class).unwrap();

        let dispatcher = dispatcher(book, DispatchConfig::new());
        assert!(matches!(
            dispatcher.dispatch(&Request::new("/fails", "GET")),
            Err(PagewrightError::DispatchError { .. })
        ));
    }
}
