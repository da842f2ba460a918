#![allow(dead_code)]

use std::env;
use std::path::{Path, PathBuf};

use capper_core::fonts::load_font;
use walkdir::WalkDir;

/// Text every fixture font must be able to show.
pub const SAMPLE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ abcdefghijklmnopqrstuvwxyz 0123456789.,!?'";

fn candidate_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(env_override) = env::var("CAPPER_TEST_FONTS") {
        roots.push(PathBuf::from(env_override));
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    roots.push(manifest_dir.join("..").join("test-fonts"));
    roots.extend(
        [
            "/usr/share/fonts",
            "/usr/local/share/fonts",
            "/System/Library/Fonts",
            "/Library/Fonts",
            "C:\\Windows\\Fonts",
        ]
        .map(PathBuf::from),
    );
    roots
}

/// First single-face font that can show [`SAMPLE`], or `None` to skip.
pub fn fixture_font() -> Option<PathBuf> {
    for root in candidate_roots() {
        if !root.exists() {
            continue;
        }

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_single_face(path) {
                continue;
            }
            if let Ok(font) = load_font("fixture", path, 0, 24.0) {
                if font.missing_glyphs(SAMPLE).is_empty() {
                    return Some(path.to_path_buf());
                }
            }
        }
    }

    None
}

fn is_single_face(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf")
    )
}

/// Copy the fixture into `dir` as `<stem>.<original extension>`.
pub fn install_font(fixture: &Path, dir: &Path, stem: &str) -> PathBuf {
    std::fs::create_dir_all(dir).expect("mkdir fonts");
    let ext = fixture
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("ttf");
    let target = dir.join(format!("{stem}.{ext}"));
    std::fs::copy(fixture, &target).expect("copy fixture font");
    target
}
