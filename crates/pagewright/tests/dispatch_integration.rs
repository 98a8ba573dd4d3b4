// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! End-to-end tests for the dispatch pipeline.
//!
//! Each test assembles an [`Application`] from page classes and in-memory
//! templates and drives it with plain [`Request`] values.

use pagewright::{
    Application, Handler, MemoryTemplates, Navigation, PageClass, PageInstance, PageResponse, Request, FLASH_COOKIE,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Routes library logs to the test output; `RUST_LOG=pagewright=debug` shows dispatch decisions.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn body(app: &Application, request: Request) -> String {
    let response = app
        .dispatch(&request)
        .expect("dispatch failed")
        .expect("no page matched");
    response.html_body().expect("not an html response").to_string()
}

#[test]
fn test_user_page_binds_path_variable() {
    init_logging();
    let user = PageClass::builder("UserPage")
        .model(json!({ "id": null, "friends": ["Ann", "Bob"] }))
        .handler(
            Handler::new("GET", |model, args| {
                model["id"] = json!(args[0]);
                Ok(Navigation::Stay)
            })
            .param("id"),
        )
        .build();

    let app = Application::builder()
        .templates(MemoryTemplates::new().with(
            "UserPage.html",
            "<h1>User ${id}</h1><ul>@Repeat(friends) <li>${__this}</li></ul>",
        ))
        .at("/users/:id", &user)
        .build()
        .unwrap();

    assert!(app.failures().is_empty());
    assert_eq!(
        body(&app, Request::new("/users/42", "GET")),
        "<h1>User 42</h1><ul><li>Ann</li><li>Bob</li></ul>"
    );
    assert!(app.dispatch(&Request::new("/users/42/extra", "GET")).unwrap().is_none());
    assert!(app.dispatch(&Request::new("/users", "GET")).unwrap().is_none());
}

#[test]
fn test_first_registered_page_wins() {
    init_logging();
    let any = PageClass::builder("Any").build();
    let exact = PageClass::builder("Exact").build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with("Any.html", "any")
                .with("Exact.html", "exact"),
        )
        .at("/docs/:section", &any)
        .at("/docs/intro", &exact)
        .build()
        .unwrap();

    assert_eq!(body(&app, Request::new("/docs/intro", "GET")), "any");
}

#[test]
fn test_layout_decorates_subclass() {
    init_logging();
    let layout = PageClass::builder("Layout").decorated().build();
    let article = PageClass::builder("Article")
        .extends(&layout)
        .model(json!({ "title": "Hello" }))
        .build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with(
                    "Layout.html",
                    "<html><head><title>${title}</title></head><body><nav>Site</nav>@Decorated <main></main></body></html>",
                )
                .with("Article.html", "<html><body><article>${title}</article></body></html>"),
        )
        .decorate(&layout)
        .at("/article", &article)
        .build()
        .unwrap();

    assert_eq!(
        body(&app, Request::new("/article", "GET")),
        "<html><head><title>Hello</title></head><body><nav>Site</nav><article>Hello</article></body></html>"
    );
}

#[test]
fn test_nested_layouts_render_one_level_at_a_time() {
    init_logging();
    let outer = PageClass::builder("Outer").decorated().build();
    let inner = PageClass::builder("Inner").extends(&outer).decorated().build();
    let leaf = PageClass::builder("Leaf").extends(&inner).build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with("Outer.html", "[L@Decorated <i></i>L]")
                .with("Inner.html", "[M@Decorated <i></i>M]")
                .with("Leaf.html", "leaf"),
        )
        .decorate(&outer)
        .decorate(&inner)
        .at("/leaf", &leaf)
        .build()
        .unwrap();

    assert!(app.failures().is_empty(), "{:?}", app.failures());
    assert_eq!(body(&app, Request::new("/leaf", "GET")), "[L[MleafM]L]");
}

#[test]
fn test_empty_segment_does_not_bind_variable() {
    init_logging();
    let edit = PageClass::builder("EditUser").build();

    let app = Application::builder()
        .templates(MemoryTemplates::new().with("EditUser.html", "edit"))
        .at("/users/:id/edit", &edit)
        .build()
        .unwrap();

    assert_eq!(body(&app, Request::new("/users/7/edit", "GET")), "edit");
    assert!(app.dispatch(&Request::new("/users//edit", "GET")).unwrap().is_none());
}

#[test]
fn test_embed_with_arguments_and_shared_requires() {
    init_logging();
    let card = PageClass::builder("Card").model(json!({ "user": "" })).build();
    let host = PageClass::builder("Host")
        .model(json!({ "name": "Ann", "other": "Bob" }))
        .build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with(
                    "Card.html",
                    "@Require <script src=\"/card.js\"></script><div class=\"card\"><h2>${user}</h2>@Include(footer) <span></span></div>",
                )
                .with(
                    "Host.html",
                    "<html><head></head><body>@Card(user=name) <div>@Argument(footer) <small>by ${name}</small></div>@Card(user=other) <div></div></body></html>",
                ),
        )
        .embed_as(&card, "Card")
        .at("/", &host)
        .build()
        .unwrap();

    assert!(app.failures().is_empty(), "{:?}", app.failures());
    assert_eq!(
        body(&app, Request::new("/", "GET")),
        "<html><head><script src=\"/card.js\"></script></head><body>\
         <div class=\"card\"><h2>Ann</h2><small>by Ann</small></div>\
         <div class=\"card\"><h2>Bob</h2></div></body></html>"
    );
}

#[test]
fn test_chained_page_is_consumed_once() {
    init_logging();
    let thanks = PageClass::builder("Thanks").model(json!({ "who": "nobody" })).build();
    let target = thanks.clone();
    let signup = PageClass::builder("Signup")
        .model(json!({ "name": "" }))
        .handler(Handler::new("POST", move |model, _| {
            let who = model["name"].clone();
            Ok(Navigation::Page(PageInstance::new(&target, json!({ "who": who }))))
        }))
        .build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with("Signup.html", "<form></form>")
                .with("Thanks.html", "<p>Thanks ${who}</p>"),
        )
        .at("/signup", &signup)
        .at("/thanks", &thanks)
        .build()
        .unwrap();

    let response = app
        .dispatch(
            &Request::new("/signup", "POST")
                .with_param("name", "Ann")
                .with_cookie(FLASH_COOKIE, "c1"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(response, PageResponse::redirect("/thanks"));

    // another conversation does not see the chained instance
    assert_eq!(
        body(&app, Request::new("/thanks", "GET").with_cookie(FLASH_COOKIE, "c2")),
        "<p>Thanks nobody</p>"
    );

    let follow_up = || Request::new("/thanks", "GET").with_cookie(FLASH_COOKIE, "c1");
    assert_eq!(body(&app, follow_up()), "<p>Thanks Ann</p>");
    assert_eq!(body(&app, follow_up()), "<p>Thanks nobody</p>");
}

#[test]
fn test_subclass_instance_renders_through_registered_ancestor() {
    init_logging();
    let base = PageClass::builder("Base")
        .model(json!({ "kind": "" }))
        .handler(Handler::new("GET", |model, _| {
            model["kind"] = json!("base");
            Ok(Navigation::Stay)
        }))
        .build();
    let special = PageClass::builder("Special")
        .extends(&base)
        .handler(Handler::new("GET", |model, _| {
            model["kind"] = json!("special");
            Ok(Navigation::Stay)
        }))
        .build();
    let chained = special.clone();
    let start = PageClass::builder("Start")
        .handler(Handler::new("GET", move |_, _| Ok(Navigation::Page(chained.instantiate()))))
        .build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with("Base.html", "<p>${kind}</p>")
                .with("Start.html", ""),
        )
        .at("/base", &base)
        .at("/start", &start)
        .build()
        .unwrap();

    let response = app.dispatch(&Request::new("/start", "GET")).unwrap().unwrap();
    assert_eq!(response, PageResponse::redirect("/base"));

    assert_eq!(body(&app, Request::new("/base", "GET")), "<p>special</p>");
    assert_eq!(body(&app, Request::new("/base", "GET")), "<p>base</p>");
}

#[test]
fn test_event_parameter_selects_handler() {
    init_logging();
    let counter = PageClass::builder("Counter")
        .model(json!({ "count": 0 }))
        .handler(
            Handler::new("POST", |model, _| {
                let count = model["count"].as_i64().unwrap_or_default();
                model["count"] = json!(count + 1);
                Ok(Navigation::Stay)
            })
            .on_event("inc"),
        )
        .handler(Handler::new("POST", |model, _| {
            model["count"] = json!(-1);
            Ok(Navigation::Stay)
        }))
        .build();

    let app = Application::builder()
        .templates(MemoryTemplates::new().with("Counter.html", "<b>${count}</b>"))
        .event_parameter("event")
        .at("/counter", &counter)
        .build()
        .unwrap();

    let post = |query: &str| Request::new("/counter", "POST").with_query_string(query);
    assert_eq!(body(&app, post("event=inc")), "<b>1</b>");
    assert_eq!(body(&app, post("event=inc&event=inc")), "<b>2</b>");
    assert_eq!(body(&app, post("event=zzz")), "<b>-1</b>");
    assert_eq!(body(&app, post("")), "<b>-1</b>");
    assert_eq!(body(&app, Request::new("/counter", "GET")), "<b>0</b>");
}

#[test]
fn test_binding_errors_are_listed() {
    init_logging();
    let form = PageClass::builder("AgeForm").model(json!({ "age": 0 })).build();

    let app = Application::builder()
        .templates(MemoryTemplates::new().with("AgeForm.html", "@Errors <ul></ul><p>${age}</p>"))
        .at("/age", &form)
        .build()
        .unwrap();

    assert_eq!(
        body(&app, Request::new("/age", "GET").with_query_string("age=abc")),
        "<ul class=\"errors\"><li>age: expected a number, got &#39;abc&#39;</li></ul><p>0</p>"
    );
    assert_eq!(
        body(&app, Request::new("/age", "GET").with_query_string("age=7")),
        "<p>7</p>"
    );
}

#[test]
fn test_context_path_prefixes_links() {
    init_logging();
    let home = PageClass::builder("Home").build();

    let app = Application::builder()
        .templates(MemoryTemplates::new().with("Home.html", "<a href=\"/about\">About</a>"))
        .context_path("/app")
        .at("/", &home)
        .build()
        .unwrap();

    assert_eq!(body(&app, Request::new("/", "GET")), "<a href=\"/app/about\">About</a>");
}

#[test]
fn test_broken_template_is_reported_not_fatal() {
    init_logging();
    let broken = PageClass::builder("Broken").build();
    let fine = PageClass::builder("Fine").build();

    let app = Application::builder()
        .templates(
            MemoryTemplates::new()
                .with("Broken.html", "<div>@Nope <p></p></div>")
                .with("Fine.html", "ok"),
        )
        .at("/broken", &broken)
        .at("/fine", &fine)
        .build()
        .unwrap();

    assert_eq!(app.failures().len(), 1);
    assert_eq!(app.failures()[0].page, "Broken");
    assert_eq!(body(&app, Request::new("/broken", "GET")), "");
    assert_eq!(body(&app, Request::new("/fine", "GET")), "ok");
}
