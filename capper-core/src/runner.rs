//! Caption run: script → layout → document on disk

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::error::UserError;
use crate::fonts::FontSet;
use crate::layout::layout;
use crate::output::write_document;
use crate::script::{parse_script, Cue};
use crate::spec::CaptionSpec;
use crate::user_error;

/// Flags that change what a run does besides writing the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Open the written document with the platform's default application.
    pub open_on_exit: bool,
    /// Print the resolved spec as TOML before running.
    pub spec_to_stdout: bool,
}

/// Everything the runner reads. Only constructible from loaded values.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub spec: &'a CaptionSpec,
    pub fonts: &'a FontSet,
    pub args: &'a RunArgs,
}

impl<'a> RunContext<'a> {
    pub fn new(spec: &'a CaptionSpec, fonts: &'a FontSet, args: &'a RunArgs) -> Self {
        Self { spec, fonts, args }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub captions: usize,
    pub lines: usize,
}

/// Lay out the script of `ctx.spec` and write the caption document.
pub fn run(ctx: &RunContext<'_>, out: &mut impl Write) -> Result<RunSummary> {
    if ctx.args.spec_to_stdout {
        let rendered = ctx.spec.to_toml()?;
        out.write_all(rendered.as_bytes())?;
        if !rendered.ends_with('\n') {
            writeln!(out)?;
        }
        out.flush()?;
    }

    let cues = load_cues(ctx.spec)?;
    debug!("script has {} cue(s)", cues.len());

    let document = layout(&cues, ctx.spec, ctx.fonts)?;
    let output = ctx.spec.output_path();

    let file = create_output(&output)?;
    let mut writer = BufWriter::new(file);
    write_document(&document, ctx.spec.output.format, &mut writer)
        .with_context(|| format!("writing {}", output.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing {}", output.display()))?;

    let summary = RunSummary {
        captions: document.captions.len(),
        lines: document.captions.iter().map(|c| c.lines.len()).sum(),
        output,
    };
    info!(
        "wrote {} caption(s), {} line(s) to {}",
        summary.captions,
        summary.lines,
        summary.output.display()
    );

    if ctx.args.open_on_exit {
        open_path(&summary.output);
    }

    Ok(summary)
}

/// Cues from the spec's script, or one name card per character without a script.
pub fn load_cues(spec: &CaptionSpec) -> Result<Vec<Cue>, UserError> {
    let Some(path) = spec.script_path() else {
        return Ok(spec
            .characters
            .keys()
            .map(|name| Cue {
                speaker: name.clone(),
                text: name.clone(),
                line: 0,
            })
            .collect());
    };

    let raw = fs::read_to_string(&path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => user_error!("script file not found: {}", path.display()),
        _ => user_error!("failed to read script {}: {err}", path.display()),
    })?;

    parse_script(&raw).map_err(|err| user_error!("{}: {}", path.display(), err.message))
}

fn create_output(path: &Path) -> Result<File, UserError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            user_error!(
                "failed to create output directory {}: {err}",
                parent.display()
            )
        })?;
    }

    File::create(path)
        .map_err(|err| user_error!("failed to create output {}: {err}", path.display()))
}

fn open_path(path: &Path) {
    match opener(path).status() {
        Ok(status) if status.success() => debug!("opened {}", path.display()),
        Ok(status) => warn!("opener for {} exited with {status}", path.display()),
        Err(err) => warn!("could not open {}: {err}", path.display()),
    }
}

fn opener(path: &Path) -> Command {
    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("open");

    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut cmd = Command::new("xdg-open");

    cmd.arg(path);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::tests::mono_font;
    use serde_json::Value;
    use tempfile::tempdir;

    const CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ .,!?'";

    fn spec_in(dir: &Path, extra: &str) -> CaptionSpec {
        let raw = format!(
            "characters = [\"Alice\", \"Bob\"]\n[text]\nbase_font_height = {{ value = 20 }}\n{extra}"
        );
        let mut spec = CaptionSpec::from_toml_str(&raw).expect("spec");
        spec.base_dir = dir.to_path_buf();
        spec
    }

    fn fonts() -> FontSet {
        [
            ("Alice".to_string(), mono_font(20.0, CHARS)),
            ("Bob".to_string(), mono_font(20.0, CHARS)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn writes_document_for_script() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("script.txt"), "[Alice] Hi Bob.\n[Bob] Hello!\n").expect("script");
        let spec = spec_in(
            tmp.path(),
            "[input]\nscript = \"script.txt\"\n[output]\npath = \"out/captions.json\"\n",
        );
        let fonts = fonts();
        let args = RunArgs::default();

        let mut stdout: Vec<u8> = Vec::new();
        let summary = run(&RunContext::new(&spec, &fonts, &args), &mut stdout).expect("run");

        assert_eq!(summary.captions, 2);
        assert_eq!(summary.output, tmp.path().join("out/captions.json"));
        assert!(stdout.is_empty());

        let written: Value =
            serde_json::from_slice(&fs::read(&summary.output).expect("read")).expect("json");
        assert_eq!(written["captions"][1]["speaker"], "Bob");
        assert_eq!(written["captions"][1]["lines"][0]["text"], "Hello!");
    }

    #[test]
    fn without_script_every_character_gets_a_name_card() {
        let tmp = tempdir().expect("tempdir");
        let spec = spec_in(tmp.path(), "");
        let cues = load_cues(&spec).expect("cues");
        let names: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn spec_to_stdout_prints_toml_first() {
        let tmp = tempdir().expect("tempdir");
        let spec = spec_in(tmp.path(), "");
        let fonts = fonts();
        let args = RunArgs {
            spec_to_stdout: true,
            ..RunArgs::default()
        };

        let mut stdout: Vec<u8> = Vec::new();
        run(&RunContext::new(&spec, &fonts, &args), &mut stdout).expect("run");

        let printed = String::from_utf8(stdout).expect("utf8");
        assert!(printed.contains("[characters.Alice]"), "{printed}");
        assert!(printed.contains("base_font_height"));
    }

    #[test]
    fn missing_script_is_user_error() {
        let tmp = tempdir().expect("tempdir");
        let spec = spec_in(tmp.path(), "[input]\nscript = \"nope.txt\"\n");
        let fonts = fonts();
        let args = RunArgs::default();

        let err = run(&RunContext::new(&spec, &fonts, &args), &mut Vec::<u8>::new()).expect_err("fails");
        let user = err.downcast_ref::<UserError>().expect("user error");
        assert!(user.message.starts_with("script file not found"));
    }

    #[test]
    fn script_errors_carry_the_path() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("s.txt"), "no tag here\n").expect("script");
        let spec = spec_in(tmp.path(), "[input]\nscript = \"s.txt\"\n");

        let err = load_cues(&spec).expect_err("untagged");
        assert!(err.message.contains("s.txt: script line 1"), "{}", err.message);
    }

    #[test]
    fn ndjson_format_is_honoured() {
        let tmp = tempdir().expect("tempdir");
        let spec = spec_in(
            tmp.path(),
            "[output]\npath = \"captions.ndjson\"\nformat = \"ndjson\"\n",
        );
        let fonts = fonts();
        let args = RunArgs::default();

        let summary = run(&RunContext::new(&spec, &fonts, &args), &mut Vec::<u8>::new()).expect("run");
        let text = fs::read_to_string(summary.output).expect("read");
        assert_eq!(text.lines().count(), 1 + 2);
    }
}
