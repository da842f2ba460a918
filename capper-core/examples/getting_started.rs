//! Library usage: run the getting-started sample without the CLI.
//!
//! ```sh
//! cargo run -p capper-core --example getting_started -- samples/getting-started/spec.toml
//! ```

use std::path::PathBuf;

use capper_core::bootstrap::{generate_caption, Options};
use capper_core::runner::RunArgs;
use capper_core::Failure;

fn main() {
    let spec_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("samples/getting-started/spec.toml"));

    let options = Options {
        args: RunArgs {
            open_on_exit: false,
            spec_to_stdout: false,
        },
        ..Options::default()
    };

    if let Err(failure) = generate_caption(&spec_path, &options) {
        if let Failure::Internal(err) = &failure {
            eprintln!("error: {err:?}");
        }
        std::process::exit(failure.exit_code());
    }
}
