// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Application assembly.
//!
//! [`Application::builder`] collects page registrations, resources and
//! collaborators. [`ApplicationBuilder::build`] registers everything (a bad
//! registration fails the build), then compiles every page's template in
//! parallel. Compile failures do not fail the build: they are logged and
//! kept in [`Application::failures`], and the affected pages render nothing.
//!
//! ```rust
//! use pagewright::{Application, MemoryTemplates, PageClass, Request};
//! use serde_json::json;
//!
//! let home = PageClass::builder("Home").model(json!({ "name": "world" })).build();
//! let app = Application::builder()
//!     .templates(MemoryTemplates::new().with("Home.html", "<p>Hello ${name}</p>"))
//!     .at("/", &home)
//!     .build()
//!     .unwrap();
//!
//! let response = app.dispatch(&Request::new("/", "GET")).unwrap().unwrap();
//! assert_eq!(response.html_body(), Some("<p>Hello world</p>"));
//! ```

use crate::bind::{PropertyBinder, RequestBinder};
use crate::class::PageClass;
use crate::compiler::{AnnotationTarget, Compiler, WidgetRegistry};
use crate::dispatcher::{DispatchConfig, RoutingDispatcher, WidgetRoutingDispatcher};
use crate::error::{PagewrightError, Result};
use crate::evaluator::{Evaluator, PathEvaluator};
use crate::flash::{FlashCache, MemoryFlashCache};
use crate::page::{Page, PageBook};
use crate::request::Request;
use crate::resources::{Resource, ResourceBook};
use crate::response::PageResponse;
use crate::templates::{MemoryTemplates, TemplateSource};
use crate::widget::Renderable;
use std::fmt;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A template that failed to load or compile.
#[derive(Debug)]
pub struct CompileFailure {
    /// Class name of the affected page.
    pub page: String,
    /// Template name.
    pub template: String,
    /// The error.
    pub error: PagewrightError,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.page, self.template, self.error)
    }
}

enum Registration {
    At(String, Arc<PageClass>),
    Embed(String, Arc<PageClass>),
    Decorate(Arc<PageClass>),
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    registrations: Vec<Registration>,
    resources: Vec<(String, Resource)>,
    templates: Arc<dyn TemplateSource>,
    evaluator: Arc<dyn Evaluator>,
    binder: Option<Arc<dyn RequestBinder>>,
    flash: Arc<dyn FlashCache>,
    registry: WidgetRegistry,
    config: DispatchConfig,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            resources: Vec::new(),
            templates: Arc::new(MemoryTemplates::new()),
            evaluator: Arc::new(PathEvaluator::new()),
            binder: None,
            flash: Arc::new(MemoryFlashCache::default()),
            registry: WidgetRegistry::new(),
            config: DispatchConfig::default(),
        }
    }
}

impl ApplicationBuilder {
    /// Registers `class` at a URI template.
    pub fn at(mut self, uri: &str, class: &Arc<PageClass>) -> Self {
        self.registrations.push(Registration::At(uri.to_string(), class.clone()));
        self
    }

    /// Registers `class` as embeddable under `name`.
    pub fn embed_as(mut self, class: &Arc<PageClass>, name: &str) -> Self {
        self.registrations.push(Registration::Embed(name.to_string(), class.clone()));
        self
    }

    /// Registers a layout class reached only through its subclasses.
    pub fn decorate(mut self, class: &Arc<PageClass>) -> Self {
        self.registrations.push(Registration::Decorate(class.clone()));
        self
    }

    /// Adds a static resource.
    pub fn resource(mut self, uri: &str, resource: Resource) -> Self {
        self.resources.push((uri.to_string(), resource));
        self
    }

    /// Sets the template source.
    pub fn templates(mut self, templates: impl TemplateSource + 'static) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    /// Replaces the expression evaluator.
    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    /// Replaces the request binder.
    pub fn binder(mut self, binder: impl RequestBinder + 'static) -> Self {
        self.binder = Some(Arc::new(binder));
        self
    }

    /// Replaces the flash cache.
    pub fn flash(mut self, flash: impl FlashCache + 'static) -> Self {
        self.flash = Arc::new(flash);
        self
    }

    /// Sets dispatch settings.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables the event discriminator parameter.
    pub fn event_parameter(mut self, name: &str) -> Self {
        self.config = self.config.with_event_parameter(name);
        self
    }

    /// Sets the context path.
    pub fn context_path(mut self, path: &str) -> Self {
        self.config = self.config.with_context_path(path);
        self
    }

    /// Changes the default `@Repeat` variable names.
    pub fn repeat_vars(mut self, var: &str, page_var: &str) -> Self {
        self.registry = self.registry.with_repeat_vars(var, page_var);
        self
    }

    /// Adds a custom annotation.
    pub fn annotation<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&AnnotationTarget) -> Result<Arc<dyn Renderable>> + Send + Sync + 'static,
    {
        self.registry.register(name, factory);
        self
    }

    /// Registers everything and compiles all templates.
    pub fn build(self) -> Result<Application> {
        let book = Arc::new(PageBook::new());
        for registration in &self.registrations {
            match registration {
                Registration::At(uri, class) => book.at(uri, class)?,
                Registration::Embed(name, class) => book.embed_as(class, name)?,
                Registration::Decorate(class) => book.decorate(class)?,
            };
        }

        let resources = Arc::new(ResourceBook::new());
        for (uri, resource) in self.resources {
            resources.at(&uri, resource);
        }

        let failures = compile_all(&book, &self.registry, self.templates.as_ref());
        for failure in &failures {
            warn!(page = %failure.page, template = %failure.template, error = %failure.error, "Template failed to compile");
        }
        info!(pages = book.len(), failures = failures.len(), "Application ready");

        let binder = self.binder.unwrap_or_else(|| {
            let mut binder = PropertyBinder::new();
            if let Some(name) = &self.config.event_parameter {
                binder = binder.skipping(name.clone());
            }
            Arc::new(binder)
        });

        let dispatcher = WidgetRoutingDispatcher::new(
            book.clone(),
            resources.clone(),
            self.evaluator,
            binder,
            self.flash,
            self.config,
        );

        Ok(Application {
            book,
            resources,
            dispatcher,
            failures,
        })
    }
}

fn compile_page(
    page: &Page,
    compiler: Compiler<'_>,
    templates: &dyn TemplateSource,
) -> std::result::Result<(), CompileFailure> {
    let Some(template) = page.class().template_name() else {
        return Ok(());
    };
    let failure = |error| CompileFailure {
        page: page.name().to_string(),
        template: template.clone(),
        error,
    };

    let source = templates.load(&template).map_err(failure)?;
    let widget = compiler.compile(&template, &source).map_err(failure)?;
    if !page.apply(widget) {
        debug!(page = page.name(), template = %template, "Page already compiled, keeping the first tree");
    }
    Ok(())
}

/// Compiles every templated page on the rayon pool.
fn compile_all(
    book: &PageBook,
    registry: &WidgetRegistry,
    templates: &dyn TemplateSource,
) -> Vec<CompileFailure> {
    let pages: Vec<Arc<Page>> = book.pages().into_iter().filter(|p| !p.is_headless()).collect();
    let compiler = Compiler::new(registry, book);

    let mut failures: Vec<CompileFailure> = pages
        .par_iter()
        .filter_map(|page| compile_page(page, compiler, templates).err())
        .collect();
    failures.sort_by(|a, b| a.page.cmp(&b.page));
    failures
}

/// An assembled, immutable application.
pub struct Application {
    book: Arc<PageBook>,
    resources: Arc<ResourceBook>,
    dispatcher: WidgetRoutingDispatcher,
    failures: Vec<CompileFailure>,
}

impl Application {
    /// Starts building an application.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// The page registry.
    pub fn book(&self) -> &Arc<PageBook> {
        &self.book
    }

    /// The static resources.
    pub fn resources(&self) -> &Arc<ResourceBook> {
        &self.resources
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &WidgetRoutingDispatcher {
        &self.dispatcher
    }

    /// Templates that failed to compile.
    pub fn failures(&self) -> &[CompileFailure] {
        &self.failures
    }

    /// Dispatches a request.
    pub fn dispatch(&self, request: &Request) -> Result<Option<PageResponse>> {
        self.dispatcher.dispatch(request)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("pages", &self.book.len())
            .field("resources", &self.resources.uris())
            .field("failures", &self.failures.len())
            .finish()
    }
}
