//! Caption measurement, wrapping and placement

use std::mem;
use std::path::PathBuf;

use log::debug;
use serde::Serialize;

use crate::error::UserError;
use crate::fonts::{FontSet, LoadedFont};
use crate::script::Cue;
use crate::spec::{Alignment, CaptionSpec, Color};
use crate::user_error;

/// Everything a renderer needs to draw the captions of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionDocument {
    pub canvas: Canvas,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
    pub captions: Vec<PlacedCaption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedCaption {
    pub speaker: String,
    pub font: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub pixel_size: f32,
    pub color: Color,
    pub stroke_width: f32,
    pub stroke_color: Color,
    pub lines: Vec<PlacedLine>,
}

/// A line of text anchored at its left edge on the baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
    pub width: f32,
}

/// Greedy word wrap. Words wider than `max_width` get a line of their own.
pub fn wrap_text(text: &str, font: &LoadedFont, max_width: Option<f32>) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let Some(limit) = max_width else {
        return vec![words.join(" ")];
    };

    let space = font.text_width(" ");
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;

    for word in words {
        let word_width = font.text_width(word);
        if current.is_empty() {
            current.push_str(word);
            width = word_width;
        } else if width + space + word_width <= limit {
            current.push(' ');
            current.push_str(word);
            width += space + word_width;
        } else {
            lines.push(mem::take(&mut current));
            current.push_str(word);
            width = word_width;
        }
    }

    lines.push(current);
    lines
}

struct Block<'a> {
    cue: &'a Cue,
    font: &'a LoadedFont,
    lines: Vec<(String, f32)>,
}

/// Place every cue top to bottom on a canvas sized to fit.
pub fn layout(
    cues: &[Cue],
    spec: &CaptionSpec,
    fonts: &FontSet,
) -> Result<CaptionDocument, UserError> {
    let text = &spec.text;
    let margin = text.margin();
    let spacing = text.line_spacing();

    let mut blocks = Vec::with_capacity(cues.len());
    for cue in cues {
        if !spec.characters.contains_key(&cue.speaker) {
            return Err(user_error!(
                "script line {}: unknown character '{}'",
                cue.line,
                cue.speaker
            ));
        }
        let font = fonts
            .get(&cue.speaker)
            .ok_or_else(|| user_error!("no font loaded for character '{}'", cue.speaker))?;

        let missing = font.missing_glyphs(&cue.text);
        if !missing.is_empty() {
            return Err(user_error!(
                "font for character '{}' has no glyph for {} (script line {})",
                cue.speaker,
                format_chars(&missing),
                cue.line
            ));
        }

        let lines: Vec<(String, f32)> = wrap_text(&cue.text, font, text.max_line_width())
            .into_iter()
            .map(|line| {
                let width = font.text_width(&line);
                (line, width)
            })
            .collect();

        if lines.is_empty() {
            debug!("skipping empty cue for '{}' at line {}", cue.speaker, cue.line);
            continue;
        }
        blocks.push(Block { cue, font, lines });
    }

    let widest = blocks
        .iter()
        .flat_map(|b| b.lines.iter().map(|(_, w)| *w))
        .fold(0.0_f32, f32::max);
    let content_width = text.max_line_width().map_or(widest, |limit| limit.max(widest));

    let mut cursor = margin;
    let mut captions = Vec::with_capacity(blocks.len());

    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            cursor += text.caption_gap();
        }

        let style = &spec.characters[&block.cue.speaker];
        let advance = block.font.line_height() * spacing;
        let first_baseline = cursor + block.font.ascent;

        let lines: Vec<PlacedLine> = block
            .lines
            .iter()
            .enumerate()
            .map(|(k, (line, width))| PlacedLine {
                text: line.clone(),
                x: margin + align_offset(text.alignment(), content_width, *width),
                baseline: first_baseline + k as f32 * advance,
                width: *width,
            })
            .collect();

        let last_baseline = lines.last().map_or(first_baseline, |l| l.baseline);
        cursor = last_baseline - block.font.descent;

        captions.push(PlacedCaption {
            speaker: block.cue.speaker.clone(),
            font: block.font.path.clone(),
            family: block.font.family.clone(),
            pixel_size: block.font.pixel_size,
            color: style.color,
            stroke_width: style.stroke_width,
            stroke_color: style.stroke_color,
            lines,
        });
    }

    Ok(CaptionDocument {
        canvas: Canvas {
            width: content_width + 2.0 * margin,
            height: cursor + margin,
        },
        background: spec.image_path(),
        captions,
    })
}

fn align_offset(alignment: Alignment, content_width: f32, line_width: f32) -> f32 {
    let slack = (content_width - line_width).max(0.0);
    match alignment {
        Alignment::Left => 0.0,
        Alignment::Center => slack / 2.0,
        Alignment::Right => slack,
    }
}

fn format_chars(chars: &[char]) -> String {
    chars
        .iter()
        .map(|c| format!("'{c}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::tests::mono_font;
    use proptest::prelude::*;

    const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz ";

    fn spec_with(extra_text: &str) -> CaptionSpec {
        let raw = format!(
            "characters = [\"A\", \"B\"]\n[text]\nbase_font_height = {{ value = 20 }}\nmargin = {{ value = 10 }}\n{extra_text}"
        );
        CaptionSpec::from_toml_str(&raw).expect("spec")
    }

    fn fonts() -> FontSet {
        [
            ("A".to_string(), mono_font(20.0, LETTERS)),
            ("B".to_string(), mono_font(20.0, LETTERS)),
        ]
        .into_iter()
        .collect()
    }

    fn cue(speaker: &str, text: &str) -> Cue {
        Cue {
            speaker: speaker.to_string(),
            text: text.to_string(),
            line: 1,
        }
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let font = mono_font(20.0, LETTERS);
        // 10px per char: "aaa bbb" is 70px.
        let lines = wrap_text("aaa bbb ccc", &font, Some(75.0));
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let font = mono_font(20.0, LETTERS);
        let lines = wrap_text("a abcdefghij b", &font, Some(50.0));
        assert_eq!(lines, vec!["a", "abcdefghij", "b"]);
    }

    #[test]
    fn no_limit_collapses_whitespace_into_one_line() {
        let font = mono_font(20.0, LETTERS);
        let lines = wrap_text("  a   b  ", &font, None);
        assert_eq!(lines, vec!["a b"]);
        assert!(wrap_text("   ", &font, None).is_empty());
    }

    #[test]
    fn centers_lines_within_wrap_width() {
        let spec = spec_with("max_line_width = { value = 100 }\n");
        let doc = layout(&[cue("A", "abcd")], &spec, &fonts()).expect("layout");

        let line = &doc.captions[0].lines[0];
        assert_eq!(line.width, 40.0);
        assert_eq!(line.x, 10.0 + 30.0);
        assert_eq!(doc.canvas.width, 120.0);
    }

    #[test]
    fn right_alignment_pushes_to_edge() {
        let spec = spec_with("max_line_width = { value = 100 }\nalignment = { value = \"right\" }\n");
        let doc = layout(&[cue("A", "ab")], &spec, &fonts()).expect("layout");
        let line = &doc.captions[0].lines[0];
        assert_eq!(line.x + line.width, 10.0 + 100.0);
    }

    #[test]
    fn captions_stack_with_gap() {
        let spec = spec_with("line_spacing = { value = 1.0 }\ncaption_gap = { value = 5 }\n");
        let doc = layout(&[cue("A", "one"), cue("B", "two")], &spec, &fonts()).expect("layout");

        // ascent 16, descent -4: first baseline at 10 + 16, block ends at 30.
        assert_eq!(doc.captions[0].lines[0].baseline, 26.0);
        assert_eq!(doc.captions[1].lines[0].baseline, 30.0 + 5.0 + 16.0);
        assert_eq!(doc.canvas.height, 55.0 + 10.0);
    }

    #[test]
    fn unknown_speaker_is_user_error() {
        let spec = spec_with("");
        let err = layout(&[cue("Zed", "hi")], &spec, &fonts()).expect_err("unknown");
        assert_eq!(err.message, "script line 1: unknown character 'Zed'");
    }

    #[test]
    fn missing_glyphs_are_listed() {
        let spec = spec_with("");
        let err = layout(&[cue("A", "hi Ω!")], &spec, &fonts()).expect_err("coverage");
        assert_eq!(
            err.message,
            "font for character 'A' has no glyph for '!', 'Ω' (script line 1)"
        );
    }

    #[test]
    fn empty_cues_are_skipped() {
        let spec = spec_with("");
        let doc = layout(&[cue("A", ""), cue("B", "ok")], &spec, &fonts()).expect("layout");
        assert_eq!(doc.captions.len(), 1);
        assert_eq!(doc.captions[0].speaker, "B");
    }

    #[test]
    fn style_is_copied_into_document() {
        let raw = "[characters.A]\ncolor = \"#ff0000\"\nstroke_width = 2\n[text]\nbase_font_height = { value = 20 }\n";
        let spec = CaptionSpec::from_toml_str(raw).expect("spec");
        let doc = layout(&[cue("A", "ab")], &spec, &fonts()).expect("layout");
        assert_eq!(doc.captions[0].color, Color::rgb(0xff, 0, 0));
        assert_eq!(doc.captions[0].stroke_width, 2.0);
        assert_eq!(doc.captions[0].family.as_deref(), Some("Mono"));
    }

    proptest! {
        #[test]
        fn wrapped_lines_fit_unless_single_word(
            words in proptest::collection::vec("[a-z]{1,12}", 1..30),
            limit in 20.0f32..200.0,
        ) {
            let font = mono_font(20.0, LETTERS);
            let text = words.join(" ");
            let lines = wrap_text(&text, &font, Some(limit));

            prop_assert_eq!(lines.join(" "), text);
            for line in &lines {
                let single_word = !line.contains(' ');
                prop_assert!(single_word || font.text_width(line) <= limit + 1e-3);
            }
        }

        #[test]
        fn placed_lines_stay_inside_canvas(
            words in proptest::collection::vec("[a-z]{1,8}", 1..20),
            limit in 50.0f32..300.0,
        ) {
            let spec = spec_with(&format!("max_line_width = {{ value = {limit} }}\n"));
            let doc = layout(&[cue("A", &words.join(" "))], &spec, &fonts()).expect("layout");

            let mut previous = f32::MIN;
            for line in &doc.captions[0].lines {
                prop_assert!(line.x >= 10.0);
                prop_assert!(line.x + line.width <= doc.canvas.width - 10.0 + 1e-3);
                prop_assert!(line.baseline > previous);
                prop_assert!(line.baseline < doc.canvas.height);
                previous = line.baseline;
            }
        }
    }
}
