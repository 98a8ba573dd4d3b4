// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiles every template and reports problems.

use std::collections::HashSet;
use std::path::Path;

use console::style;
use pagewright::Application;

use crate::config::Config;
use crate::site::build_site;

/// Template files under `templates_dir` that no registered page loads,
/// as paths relative to the directory.
pub fn unused_templates(app: &Application, templates_dir: &Path) -> anyhow::Result<Vec<String>> {
    let used: HashSet<String> = app
        .book()
        .pages()
        .iter()
        .filter_map(|page| page.class().template_name())
        .collect();

    let pattern = templates_dir.join("**").join("*.html");
    let mut unused = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry?;
        let Ok(relative) = path.strip_prefix(templates_dir) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        if !used.contains(&name) {
            unused.push(name);
        }
    }
    unused.sort();
    Ok(unused)
}

/// Runs the check command. Fails if any template does not compile.
pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let app = build_site(&config)?;

    for name in unused_templates(&app, &config.templates_dir())? {
        println!("{} {}", style("Unused template:").dim(), name);
    }

    let failures = super::report_failures(&app);
    if failures > 0 {
        anyhow::bail!("{} template(s) failed to compile", failures);
    }

    println!(
        "{} {} page(s) compiled",
        style("✓").green(),
        app.book().pages().iter().filter(|page| page.widget().is_some()).count()
    );
    Ok(())
}
