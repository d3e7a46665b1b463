/// Escape text for Telegram HTML parse mode.
///
/// Telegram HTML supports only a small tag subset; anything user-provided
/// (display names) must be escaped before interpolation.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
