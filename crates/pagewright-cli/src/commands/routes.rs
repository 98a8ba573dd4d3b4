// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Prints the page book.

use std::path::Path;

use console::style;
use pagewright::Page;

use crate::config::Config;
use crate::site::build_site;

/// One printed line per registered page, in registration order.
pub fn describe(page: &Page) -> String {
    let location = match (page.uri(), page.embed_name()) {
        (Some(uri), _) => uri.to_string(),
        (None, Some(name)) => format!("@{}", name),
        (None, None) => "(layout)".to_string(),
    };

    let mut flags = Vec::new();
    if page.is_decorated() {
        flags.push("decorated");
    }
    if page.is_headless() {
        flags.push("headless");
    }
    if page.widget().is_none() && !page.is_headless() {
        flags.push("uncompiled");
    }

    let mut methods = page.method_keys();
    methods.sort_unstable();

    let mut line = format!("{:<30} {}", location, page.name());
    if !methods.is_empty() {
        line.push_str(&format!(" [{}]", methods.join(", ")));
    }
    if !flags.is_empty() {
        line.push_str(&format!(" ({})", flags.join(", ")));
    }
    line
}

/// Runs the routes command.
pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let app = build_site(&config)?;

    for page in app.book().pages() {
        println!("{}", describe(&page));
    }
    for uri in app.resources().uris() {
        println!("{:<30} {}", uri, style("(resource)").dim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright::{Handler, Navigation, PageBook, PageClass};

    #[test]
    fn test_describe() {
        let book = PageBook::new();
        let class = PageClass::builder("UserPage")
            .handler(Handler::new("POST", |_, _| Ok(Navigation::Stay)))
            .handler(Handler::new("GET", |_, _| Ok(Navigation::Stay)))
            .build();
        let page = book.at("/users/:id", &class).unwrap();
        assert_eq!(
            describe(&page),
            format!("{:<30} UserPage [GET, POST] (uncompiled)", "/users/:id")
        );

        let card = book.embed_as(&PageClass::builder("Card").headless().build(), "Card").unwrap();
        assert_eq!(describe(&card), format!("{:<30} Card (headless)", "@Card"));
    }
}
