use std::fs;
use std::path::Path;

/// Wrap `text` in an OSC8 terminal hyperlink to `url`
pub fn osc8_link(url: &str, text: &str) -> String {
    format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
}

/// OSC8 `file://` hyperlink to `path`, labelled with the path as given
pub fn osc8_file_link(path: &Path) -> String {
    let abs_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    osc8_link(
        &format!("file://{}", abs_path.display()),
        &path.display().to_string(),
    )
}
