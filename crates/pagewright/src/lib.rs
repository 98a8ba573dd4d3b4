// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

// PagewrightError carries source snippets for template errors.
#![allow(clippy::result_large_err)]

//! # Pagewright
//!
//! Page routing and widget-tree templating for server-rendered sites.
//!
//! Pages are classes with a model, typed event handlers and an HTML
//! template. Templates compile into trees of widgets that render against the
//! page's model; annotations in the template add loops, conditionals,
//! embedded pages and layout inheritance.
//!
//! ## Features
//!
//! - URI templates with literal, variable and regex-bound segments
//! - First-match routing with static-prefix buckets
//! - Handlers keyed by HTTP verb and an optional event parameter
//! - `@Repeat`, `@ShowIf`, embeds with argument slots, `@Decorated` layouts
//! - Page chaining through a consume-once flash cache
//! - Static resources with SHA-256 ETags
//!
//! ## Quick Start
//!
//! ```rust
//! use pagewright::{Application, Handler, MemoryTemplates, Navigation, PageClass, Request};
//! use serde_json::json;
//!
//! let user = PageClass::builder("UserPage")
//!     .model(json!({ "id": null, "friends": ["Ann", "Bob"] }))
//!     .handler(Handler::new("GET", |model, args| {
//!         model["id"] = json!(args[0]);
//!         Ok(Navigation::Stay)
//!     }).param("id"))
//!     .build();
//!
//! let app = Application::builder()
//!     .templates(MemoryTemplates::new().with(
//!         "UserPage.html",
//!         "<h1>User ${id}</h1><ul>@Repeat(friends) <li>${__this}</li></ul>",
//!     ))
//!     .at("/users/:id", &user)
//!     .build()
//!     .unwrap();
//!
//! let response = app.dispatch(&Request::new("/users/42", "GET")).unwrap().unwrap();
//! assert_eq!(
//!     response.html_body(),
//!     Some("<h1>User 42</h1><ul><li>Ann</li><li>Bob</li></ul>")
//! );
//! ```

/// Application assembly and template compilation at startup.
pub mod app;
/// Bind expressions and request parameter binding.
pub mod bind;
/// Page classes, handlers and instances.
pub mod class;
/// Template compiler and annotation registry.
pub mod compiler;
/// Request dispatch.
pub mod dispatcher;
/// Error types and reporting.
pub mod error;
/// Expression evaluation against JSON models.
pub mod evaluator;
/// Page chaining storage.
pub mod flash;
/// URI template matching.
pub mod matcher;
/// Registered pages and the page book.
pub mod page;
/// HTTP request abstraction.
pub mod request;
/// Static resources.
pub mod resources;
/// Output sinks for rendering.
pub mod respond;
/// HTTP response abstraction.
pub mod response;
/// Template sources.
pub mod templates;
/// Widget tree.
pub mod widget;

pub use app::{Application, ApplicationBuilder, CompileFailure};
pub use bind::{parse_bind_expression, PropertyBinder, RequestBinder};
pub use class::{Handler, HandlerFn, Navigation, PageClass, PageClassBuilder, PageInstance, Param};
pub use compiler::{AnnotationTarget, Compiler, WidgetFactory, WidgetRegistry};
pub use dispatcher::{DispatchConfig, RoutingDispatcher, WidgetRoutingDispatcher};
pub use error::{BoxError, PagewrightError, Result, SourceContext};
pub use evaluator::{Evaluator, PathEvaluator};
pub use flash::{FlashCache, FlashEntry, MemoryFlashCache, FLASH_COOKIE};
pub use matcher::{PathMatcher, PathMatcherChain};
pub use page::{InstancePage, Page, PageBook};
pub use request::Request;
pub use resources::{Resource, ResourceBook};
pub use respond::{EmbeddedRespond, Respond, StringRespond};
pub use response::PageResponse;
#[cfg(feature = "filesystem")]
pub use templates::FileSystemTemplates;
pub use templates::{MemoryTemplates, TemplateSource};
pub use widget::{collect, RenderContext, Renderable, WidgetChain, WidgetKind};
