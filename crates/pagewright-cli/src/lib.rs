// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! Pagewright CLI library.
//!
//! This crate provides the command-line interface and HTTP server for
//! sites built with the pagewright engine. Pages, their URIs and their
//! inheritance are declared in `pagewright.toml`; templates are loaded
//! from the templates directory.
//!
//! # Usage
//!
//! This crate is primarily used through the `pagewright` binary:
//!
//! ```bash
//! pagewright serve    # Run the HTTP server
//! pagewright routes   # Print the registered pages
//! pagewright check    # Compile all templates and report failures
//! ```
//!
//! # Configuration
//!
//! Sites are configured via `pagewright.toml` at the project root.

/// CLI commands (serve, routes, check).
pub mod commands;
/// Site configuration from `pagewright.toml`.
pub mod config;
/// axum adapter.
pub mod server;
/// Application assembly from configuration.
pub mod site;
