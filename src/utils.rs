use std::fmt::Write;

/// Formats frame bytes as a bracketed list of decimal values.
pub(crate) fn format_frame(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len().saturating_mul(4) + 2);
    rendered.push('[');
    for (index, value) in bytes.iter().enumerate() {
        if index > 0 {
            rendered.push(' ');
        }
        let _ = write!(rendered, "{value}");
    }
    rendered.push(']');
    rendered
}
