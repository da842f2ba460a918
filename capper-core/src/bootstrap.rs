//! Load spec and fonts, run, and report: the single error boundary of a run
//!
//! Both the `capper` binary and library users go through
//! [`generate_caption`] (or [`generate_caption_with`] for a custom console),
//! so the load order and the console contract cannot drift apart:
//!
//! - success: `Program finished in X.XX seconds`, then a divider;
//! - [`UserError`]: a divider, then `UserError: <message>`.
//!
//! Anything that is not a [`UserError`] is returned untouched as
//! [`Failure::Internal`] for the caller to treat as fatal.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info};

use crate::console::{ColorChoice, Console};
use crate::error::{Failure, UserError};
use crate::fonts::{load_fonts, FontAssets};
use crate::runner::{self, RunArgs, RunContext, RunSummary};
use crate::spec::CaptionSpec;
use crate::timer::{format_secs, Timer};
use crate::user_error;

/// Caller-side knobs for one run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub args: RunArgs,
    /// Replaces `[fonts] dir`; relative to the working directory.
    pub fonts_dir: Option<PathBuf>,
    /// Replaces `[output] path`; relative to the working directory.
    pub output: Option<PathBuf>,
    pub color: ColorChoice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub elapsed_secs: f64,
    pub summary: RunSummary,
}

/// Run against stdout, deciding colour support from `options.color`.
pub fn generate_caption(spec_path: &Path, options: &Options) -> Result<Finished, Failure> {
    let mut console = Console::stdout(options.color);
    generate_caption_with(spec_path, options, &mut console)
}

pub fn generate_caption_with<W: Write>(
    spec_path: &Path,
    options: &Options,
    console: &mut Console<W>,
) -> Result<Finished, Failure> {
    let timer = Timer::start();

    match execute(spec_path, options, console) {
        Ok(summary) => {
            let elapsed_secs = timer.elapsed_secs();
            report_finished(console, elapsed_secs).map_err(internal)?;
            info!("run finished in {}s", format_secs(elapsed_secs));
            Ok(Finished {
                elapsed_secs,
                summary,
            })
        }
        Err(err) => match Failure::from(err) {
            Failure::User(user) => {
                debug!("run stopped by user error: {user}");
                report_user_error(console, &user).map_err(internal)?;
                Err(Failure::User(user))
            }
            internal => Err(internal),
        },
    }
}

fn execute<W: Write>(
    spec_path: &Path,
    options: &Options,
    console: &mut Console<W>,
) -> Result<RunSummary> {
    let mut spec = CaptionSpec::load(spec_path)?;
    apply_overrides(&mut spec, options)?;

    let assets = FontAssets::from_spec(&spec)?;
    let fonts = load_fonts(&spec.characters, spec.text.base_font_height(), &assets)?;

    let ctx = RunContext::new(&spec, &fonts, &options.args);
    let summary = runner::run(&ctx, console.writer())?;
    Ok(summary)
}

fn apply_overrides(spec: &mut CaptionSpec, options: &Options) -> Result<(), UserError> {
    if let Some(dir) = &options.fonts_dir {
        spec.fonts.dir = Some(absolute(dir)?);
    }
    if let Some(output) = &options.output {
        spec.output.path = absolute(output)?;
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, UserError> {
    std::path::absolute(path)
        .map_err(|err| user_error!("cannot resolve path {}: {err}", path.display()))
}

fn report_finished<W: Write>(console: &mut Console<W>, elapsed_secs: f64) -> io::Result<()> {
    console.header(&format!(
        "Program finished in {} seconds",
        format_secs(elapsed_secs)
    ))?;
    console.divider()?;
    console.flush()
}

fn report_user_error<W: Write>(console: &mut Console<W>, err: &UserError) -> io::Result<()> {
    console.divider()?;
    console.user_error(&err.message)?;
    console.flush()
}

fn internal(err: io::Error) -> Failure {
    Failure::Internal(err.into())
}
