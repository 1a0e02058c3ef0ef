/// Inline annotation marker: `{{tags}}` or `{{count,tags}}`.
///
/// The marker owns its delimiters; the parser and serializer never hardcode
/// them.
pub struct Marker;

impl Marker {
    pub const OPEN: &'static str = "{{";
    pub const CLOSE: &'static str = "}}";
    pub const SEP: char = ',';

    /// Characters allowed in the marker body (tokens and separators).
    pub fn is_body_char(c: char) -> bool {
        c.is_alphanumeric() || c == Self::SEP
    }

    /// Render a marker for a span of `width` characters.
    pub fn render(width: usize, labels: &str) -> String {
        if width > 1 {
            format!("{}{width}{}{labels}{}", Self::OPEN, Self::SEP, Self::CLOSE)
        } else {
            format!("{}{labels}{}", Self::OPEN, Self::CLOSE)
        }
    }
}
