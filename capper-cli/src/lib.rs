//! capper CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use log::debug;

use capper_core::bootstrap::{generate_caption, Options};
use capper_core::console;
use capper_core::runner::RunArgs;
use capper_core::Failure;

/// CLI entrypoint for capper.
#[derive(Debug, Parser)]
#[command(
    name = "capper",
    version,
    about = "Lay out dialogue captions from a TOML spec"
)]
pub struct Cli {
    /// Spec file describing characters, text settings, input and output
    #[arg(value_hint = ValueHint::FilePath)]
    spec: PathBuf,

    /// Directory searched for <character>.ttf/.otf (overrides [fonts] dir)
    #[arg(long = "fonts-dir", value_hint = ValueHint::DirPath)]
    fonts_dir: Option<PathBuf>,

    /// Where to write the caption document (overrides [output] path)
    #[arg(short = 'o', long = "output", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Open the caption document once it is written
    #[arg(long = "open", action = ArgAction::SetTrue)]
    open_on_exit: bool,

    /// Print the resolved spec as TOML before running
    #[arg(long = "spec-to-stdout", action = ArgAction::SetTrue)]
    spec_to_stdout: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl From<ColorChoice> for console::ColorChoice {
    fn from(choice: ColorChoice) -> Self {
        match choice {
            ColorChoice::Auto => console::ColorChoice::Auto,
            ColorChoice::Always => console::ColorChoice::Always,
            ColorChoice::Never => console::ColorChoice::Never,
        }
    }
}

/// Parse CLI args, run once, and return the process exit code.
///
/// User errors are already reported on stdout and map to exit code 1; any
/// other failure is returned for the binary to print.
pub fn run() -> Result<i32> {
    run_cli(Cli::parse())
}

fn run_cli(cli: Cli) -> Result<i32> {
    let options = build_options(&cli);
    debug!("running {} with {:?}", cli.spec.display(), options);

    match generate_caption(&cli.spec, &options) {
        Ok(_) => Ok(0),
        Err(failure @ Failure::User(_)) => Ok(failure.exit_code()),
        Err(Failure::Internal(err)) => Err(err),
    }
}

fn build_options(cli: &Cli) -> Options {
    Options {
        args: RunArgs {
            open_on_exit: cli.open_on_exit,
            spec_to_stdout: cli.spec_to_stdout,
        },
        fonts_dir: cli.fonts_dir.clone(),
        output: cli.output.clone(),
        color: cli.color.into(),
    }
}
