//! capper-core: spec-driven caption layout
//!
//! A run reads a TOML spec describing the speaking characters and text
//! settings, loads one font per character, lays out a dialogue script with
//! those fonts and writes the result as a JSON caption document.
//!
//! ## Modules
//!
//! - [`spec`]: spec file parsing and validation ([`spec::CaptionSpec`])
//! - [`fonts`]: font asset lookup and loading ([`fonts::FontSet`])
//! - [`script`]: `[Name] text` dialogue scripts
//! - [`layout`]: wrapping and placement of captions
//! - [`runner`]: one run over an explicit [`runner::RunContext`]
//! - [`bootstrap`]: the shared entry point and error boundary
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use capper_core::bootstrap::{generate_caption, Options};
//!
//! match generate_caption(Path::new("samples/getting-started/spec.toml"), &Options::default()) {
//!     Ok(done) => println!("{} captions", done.summary.captions),
//!     Err(failure) => std::process::exit(failure.exit_code()),
//! }
//! ```

pub mod bootstrap;
pub mod console;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod output;
pub mod runner;
pub mod script;
pub mod spec;
pub mod timer;

pub use error::{Failure, UserError};
