// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `serve`: Run the HTTP server
//! - `routes`: Print the registered pages
//! - `check`: Compile every template and report failures

/// Template check command.
pub mod check;
/// Page listing command.
pub mod routes;
/// HTTP server command.
pub mod serve;

use console::style;
use pagewright::Application;

/// Prints compile failures as warnings. Returns the number printed.
pub(crate) fn report_failures(app: &Application) -> usize {
    for failure in app.failures() {
        println!(
            "{} {} ({}): {}",
            style("Warning:").yellow(),
            failure.page,
            style(&failure.template).dim(),
            failure.error
        );
    }
    app.failures().len()
}
