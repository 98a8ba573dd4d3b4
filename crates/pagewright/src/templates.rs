// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template sources.
//!
//! A [`TemplateSource`] loads a page's template text by name (see
//! [`PageClass::template_name`](crate::PageClass::template_name)).
//!
//! - [`FileSystemTemplates`]: reads files under a root directory
//! - [`MemoryTemplates`]: in-memory map, for tests and embedded sites

use crate::error::{PagewrightError, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Loads template source text by name.
pub trait TemplateSource: Send + Sync {
    /// Returns the template text, or [`PagewrightError::TemplateNotFound`].
    fn load(&self, name: &str) -> Result<String>;
}

/// In-memory templates. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTemplates {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, builder style.
    pub fn with(self, name: &str, source: impl Into<String>) -> Self {
        self.add_template(name, source);
        self
    }

    /// Adds or replaces a template.
    pub fn add_template(&self, name: &str, source: impl Into<String>) {
        self.templates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), source.into());
    }

    /// Removes a template.
    pub fn remove_template(&self, name: &str) {
        self.templates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

impl TemplateSource for MemoryTemplates {
    fn load(&self, name: &str) -> Result<String> {
        self.templates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| PagewrightError::TemplateNotFound(name.to_string()))
    }
}

/// Templates read from a directory.
///
/// Names are relative paths below the root; names that would escape the
/// root (absolute paths, `..`) are not found.
#[cfg(feature = "filesystem")]
#[derive(Debug, Clone)]
pub struct FileSystemTemplates {
    root: PathBuf,
}

#[cfg(feature = "filesystem")]
impl FileSystemTemplates {
    /// Creates a source rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[cfg(feature = "filesystem")]
impl TemplateSource for FileSystemTemplates {
    fn load(&self, name: &str) -> Result<String> {
        let path = self
            .resolve(name)
            .ok_or_else(|| PagewrightError::TemplateNotFound(name.to_string()))?;

        if !path.is_file() {
            return Err(PagewrightError::TemplateNotFound(format!(
                "{} (looked in {})",
                name,
                path.display()
            )));
        }
        Ok(std::fs::read_to_string(path)?)
    }
}
