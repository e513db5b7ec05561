// Media field helpers: asset file names and missing-file detection

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Prefix for asset files written into the media directory
pub const ASSET_FILENAME_PREFIX: &str = "D2D";

fn img_src() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex")
    })
}

fn sound_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[sound:([^\]]+)\]").expect("valid regex"))
}

/// Term with path separators, characters reserved in file names and the
/// brackets of `[sound:...]` replaced by `_`
fn filename_stem(term: &str) -> String {
    term.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '[' | ']' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn default_image_filename(term: &str) -> String {
    format!("{}-{}.jpg", ASSET_FILENAME_PREFIX, filename_stem(term))
}

pub fn default_audio_filename(term: &str, extension: &str) -> String {
    format!("{}-{}.{}", ASSET_FILENAME_PREFIX, filename_stem(term), extension)
}

/// First `<img src="...">` in a field value, or "" when there is none
pub fn get_image(field_value: &str) -> String {
    img_src()
        .captures(field_value)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// First `[sound:...]` file name in a field value, or "" when there is none
pub fn get_audio(field_value: &str) -> String {
    sound_tag()
        .captures(field_value)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

pub fn is_image_file_missing(field_value: &str, media_dir: &Path) -> bool {
    is_media_file_missing(field_value, media_dir, get_image)
}

pub fn is_audio_file_missing(field_value: &str, media_dir: &Path) -> bool {
    is_media_file_missing(field_value, media_dir, get_audio)
}

/// A field that references no file is never "missing"
fn is_media_file_missing(field_value: &str, media_dir: &Path, extract: fn(&str) -> String) -> bool {
    let filename = extract(field_value);
    if field_value.is_empty() || filename.is_empty() {
        return false;
    }
    !media_dir.join(filename).exists()
}
