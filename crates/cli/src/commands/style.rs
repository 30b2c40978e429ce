//! Shared styling utilities for terminal output.

use console::Style;

use ghmulti_core::IdentitySource;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create an informational string (cyan).
pub fn info(msg: &str) -> String {
    let style = Style::new().cyan();
    format!("{} {}", style.apply_to("ℹ"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Label for where the effective account came from.
pub fn source_label(source: IdentitySource) -> String {
    match source {
        IdentitySource::Linked => Style::new().blue().bold().apply_to("linked").to_string(),
        IdentitySource::Global => Style::new().green().bold().apply_to("global").to_string(),
    }
}
