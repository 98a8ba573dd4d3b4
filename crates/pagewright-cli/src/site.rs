// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Site assembly from configuration.
//!
//! Each `[[page]]` entry becomes a [`PageClass`]. Classes are built parents
//! first, so `extends` may name a page declared later in the file. A page is
//! registered at its URI, as an embed, or (for layouts reached only through
//! subclasses) as a decorator; a page with none of these is an abstract
//! base class.
//!
//! Configured pages have no code, so pages whose URI has variables get
//! `GET` and `POST` handlers that copy the path variables into the model.

use crate::config::{Config, PageConfig};
use pagewright::{
    Application, DispatchConfig, FileSystemTemplates, Handler, MemoryFlashCache, Navigation, PageClass,
    PathMatcherChain,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Configuration problems found while assembling a site.
#[derive(Error, Debug)]
pub enum SiteError {
    /// Two `[[page]]` entries share a name.
    #[error("page '{0}' is declared more than once")]
    DuplicatePage(String),

    /// `extends` names an undeclared page.
    #[error("page '{page}' extends unknown page '{parent}'")]
    UnknownParent {
        /// The declaring page.
        page: String,
        /// The missing parent.
        parent: String,
    },

    /// `extends` forms a cycle.
    #[error("page '{0}' extends itself")]
    Cycle(String),

    /// A page has both a URI and an embed name.
    #[error("page '{0}' cannot have both a uri and an embed name")]
    AmbiguousRegistration(String),

    /// A model is not a table.
    #[error("model of page '{0}' must be a table")]
    InvalidModel(String),

    /// A URI template failed to compile.
    #[error(transparent)]
    Pagewright(#[from] pagewright::PagewrightError),
}

/// Builds page classes for every entry, keyed by name.
pub fn build_classes(pages: &[PageConfig]) -> Result<HashMap<String, Arc<PageClass>>, SiteError> {
    let mut declared: HashMap<&str, &PageConfig> = HashMap::new();
    for page in pages {
        if declared.insert(page.name.as_str(), page).is_some() {
            return Err(SiteError::DuplicatePage(page.name.clone()));
        }
    }

    let mut classes = HashMap::new();
    for page in pages {
        build_class(page, &declared, &mut classes, &mut Vec::new())?;
    }
    Ok(classes)
}

fn build_class(
    page: &PageConfig,
    declared: &HashMap<&str, &PageConfig>,
    classes: &mut HashMap<String, Arc<PageClass>>,
    visiting: &mut Vec<String>,
) -> Result<Arc<PageClass>, SiteError> {
    if let Some(class) = classes.get(&page.name) {
        return Ok(class.clone());
    }
    if visiting.contains(&page.name) {
        return Err(SiteError::Cycle(page.name.clone()));
    }
    visiting.push(page.name.clone());

    let mut builder = PageClass::builder(page.name.clone());
    if let Some(parent_name) = &page.extends {
        let parent = declared.get(parent_name.as_str()).ok_or_else(|| SiteError::UnknownParent {
            page: page.name.clone(),
            parent: parent_name.clone(),
        })?;
        builder = builder.extends(&build_class(parent, declared, classes, visiting)?);
    }

    match &page.model {
        Value::Null => {}
        Value::Object(_) => builder = builder.model(page.model.clone()),
        _ => return Err(SiteError::InvalidModel(page.name.clone())),
    }
    if page.decorated {
        builder = builder.decorated();
    }
    if let Some(template) = &page.template {
        builder = builder.template(template.clone());
    }
    if let Some(uri) = &page.uri {
        let variables: Vec<String> = PathMatcherChain::compile(uri)?
            .variable_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !variables.is_empty() {
            builder = builder
                .handler(path_handler("GET", &variables))
                .handler(path_handler("POST", &variables));
        }
    }

    let class = builder.build();
    visiting.pop();
    classes.insert(page.name.clone(), class.clone());
    Ok(class)
}

/// A handler writing each path variable onto the model property of the same name.
fn path_handler(verb: &str, variables: &[String]) -> Handler {
    let names = variables.to_vec();
    let mut handler = Handler::new(verb, move |model, args| {
        if let Some(fields) = model.as_object_mut() {
            for (name, value) in names.iter().zip(args) {
                if let Some(value) = value {
                    fields.insert(name.clone(), Value::String(value.clone()));
                }
            }
        }
        Ok(Navigation::Stay)
    });
    for name in variables {
        handler = handler.param(name.clone());
    }
    handler
}

/// Assembles the application described by `config` and compiles its templates.
pub fn build_site(config: &Config) -> anyhow::Result<Application> {
    let classes = build_classes(&config.pages)?;

    let mut dispatch = DispatchConfig::new().with_context_path(config.server.context_path.clone());
    if let Some(name) = &config.routing.event_parameter {
        dispatch = dispatch.with_event_parameter(name.clone());
    }

    let mut builder = Application::builder()
        .templates(FileSystemTemplates::new(config.templates_dir()))
        .flash(MemoryFlashCache::new(config.routing.flash_capacity))
        .config(dispatch);

    for page in &config.pages {
        let class = &classes[&page.name];
        builder = match (&page.uri, &page.embed) {
            (Some(_), Some(_)) => return Err(SiteError::AmbiguousRegistration(page.name.clone()).into()),
            (Some(uri), None) => builder.at(uri, class),
            (None, Some(name)) => builder.embed_as(class, name),
            (None, None) if page.decorated => builder.decorate(class),
            (None, None) => {
                debug!(page = %page.name, "Abstract page, not registered");
                builder
            }
        };
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(name: &str) -> PageConfig {
        PageConfig {
            name: name.to_string(),
            uri: None,
            template: None,
            extends: None,
            decorated: false,
            embed: None,
            model: Value::Null,
        }
    }

    #[test]
    fn test_parents_may_be_declared_later() {
        let mut child = page("Child");
        child.extends = Some("Base".into());
        let mut base = page("Base");
        base.model = json!({ "title": "t" });

        let classes = build_classes(&[child, base]).unwrap();
        let child = &classes["Child"];
        assert_eq!(child.parent().map(|p| p.name()), Some("Base"));
        assert_eq!(child.instantiate().model, json!({ "title": "t" }));
    }

    #[test]
    fn test_configuration_errors() {
        let mut orphan = page("Orphan");
        orphan.extends = Some("Nobody".into());
        assert!(matches!(build_classes(&[orphan]), Err(SiteError::UnknownParent { .. })));

        let mut a = page("A");
        a.extends = Some("B".into());
        let mut b = page("B");
        b.extends = Some("A".into());
        assert!(matches!(build_classes(&[a, b]), Err(SiteError::Cycle(_))));

        assert!(matches!(
            build_classes(&[page("Same"), page("Same")]),
            Err(SiteError::DuplicatePage(_))
        ));

        let mut scalar = page("Scalar");
        scalar.model = json!(3);
        assert!(matches!(build_classes(&[scalar]), Err(SiteError::InvalidModel(_))));
    }

    #[test]
    fn test_path_variables_reach_the_model() {
        let mut user = page("User");
        user.uri = Some("/users/:id".into());
        user.model = json!({ "id": "" });

        let classes = build_classes(&[user]).unwrap();
        let class = &classes["User"];
        let keys: Vec<String> = class.declared_handlers().iter().map(Handler::key).collect();
        assert_eq!(keys, vec!["GET", "POST"]);

        let mut model = class.instantiate().model;
        class.declared_handlers()[0]
            .call(&mut model, &[Some("42".to_string())])
            .unwrap();
        assert_eq!(model, json!({ "id": "42" }));
    }
}
