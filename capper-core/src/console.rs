//! Console reporting: header lines, dividers and user error reports

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;

const DIVIDER_WIDTH: usize = 60;

/// How the console decides whether to emit ANSI styling.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Line-oriented writer for the messages a run shows to the user.
///
/// Colour support is decided once when the console is created; every later
/// write reuses that decision.
#[derive(Debug)]
pub struct Console<W: Write> {
    out: W,
    color: bool,
}

impl Console<io::Stdout> {
    /// Console on stdout, resolving `Auto` against whether stdout is a terminal.
    pub fn stdout(choice: ColorChoice) -> Self {
        let out = io::stdout();
        let color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => out.is_terminal(),
        };
        Self { out, color }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Raw access for components that print their own payload (e.g. the spec dump).
    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", text.bold().green())
        } else {
            writeln!(self.out, "{text}")
        }
    }

    pub fn divider(&mut self) -> io::Result<()> {
        let line = "-".repeat(DIVIDER_WIDTH);
        if self.color {
            writeln!(self.out, "{}", line.dimmed())
        } else {
            writeln!(self.out, "{line}")
        }
    }

    /// `UserError: <message>`, preceded by a blank line.
    pub fn user_error(&mut self, message: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "\n{} {message}", "UserError:".red().bold())
        } else {
            writeln!(self.out, "\nUserError: {message}")
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
