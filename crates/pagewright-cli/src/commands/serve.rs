// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Server command.

use std::path::Path;
use std::sync::Arc;

use console::style;

use crate::config::Config;
use crate::server::{router, AppState};
use crate::site::build_site;

/// Builds the site and serves it until interrupted.
///
/// `host` and `port` override the `[server]` settings when given.
pub async fn run(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!("{}", style(format!("Starting {}...", config.project.name)).cyan().bold());
    let app = build_site(&config)?;
    println!("{} {} page(s)", style("Loaded").green(), app.book().len());
    super::report_failures(&app);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let url = format!("http://{}{}/", addr, config.server.context_path);
    let state = Arc::new(AppState { app, config });

    println!();
    println!(
        "{} {}",
        style("Server running at").green().bold(),
        style(url).cyan().underlined()
    );
    println!("{}", style("Press Ctrl+C to stop").dim());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
