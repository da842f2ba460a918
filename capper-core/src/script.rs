//! Dialogue script parsing
//!
//! A script is plain text where `[Name] words` starts a caption spoken by
//! `Name`. Untagged lines continue the caption above them, blank lines are
//! ignored and lines starting with `#` are comments.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::UserError;
use crate::user_error;

/// One caption: who speaks and what they say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cue {
    pub speaker: String,
    pub text: String,
    /// 1-based line of the tag that opened this cue.
    pub line: usize,
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^\[([^\[\]]+)\]\s*(.*)$").expect("static regex"))
}

pub fn parse_script(raw: &str) -> Result<Vec<Cue>, UserError> {
    let mut cues: Vec<Cue> = Vec::new();

    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(caps) = tag_pattern().captures(trimmed) {
            let speaker = caps[1].trim();
            if speaker.is_empty() {
                return Err(user_error!("script line {line_no}: empty speaker tag"));
            }
            cues.push(Cue {
                speaker: speaker.to_string(),
                text: caps[2].trim().to_string(),
                line: line_no,
            });
            continue;
        }

        match cues.last_mut() {
            Some(cue) if cue.text.is_empty() => cue.text.push_str(trimmed),
            Some(cue) => {
                cue.text.push(' ');
                cue.text.push_str(trimmed);
            }
            None => {
                return Err(user_error!(
                    "script line {line_no} has no speaker tag (expected `[Name] text`)"
                ))
            }
        }
    }

    Ok(cues)
}
