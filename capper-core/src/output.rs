//! Streaming output helpers for caption documents

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::layout::{Canvas, CaptionDocument};
use crate::spec::OutputFormat;

/// Write the document in the requested encoding.
pub fn write_document(doc: &CaptionDocument, format: OutputFormat, w: impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => write_json_pretty(doc, w),
        OutputFormat::Ndjson => write_ndjson(doc, w),
    }
}

/// Write the document as one prettified JSON object.
pub fn write_json_pretty(doc: &CaptionDocument, mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

#[derive(Serialize)]
struct NdjsonHeader<'a> {
    canvas: &'a Canvas,
    #[serde(skip_serializing_if = "Option::is_none")]
    background: Option<&'a std::path::Path>,
}

/// Write a header line with the canvas, then one caption per line (NDJSON).
pub fn write_ndjson(doc: &CaptionDocument, mut w: impl Write) -> Result<()> {
    let header = NdjsonHeader {
        canvas: &doc.canvas,
        background: doc.background.as_deref(),
    };
    serde_json::to_writer(&mut w, &header)?;
    w.write_all(b"\n")?;

    for caption in &doc.captions {
        let line = serde_json::to_string(caption)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
