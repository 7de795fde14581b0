//! Mapping between resolved document offsets and host source offsets.
//!
//! A literal's document text is its cooked content: escape sequences are
//! replaced by the characters they denote, and every `${...}` site is either
//! blanked with spaces of equal length or replaced by the text of the literal
//! it references. Blanked sites keep a constant shift; escapes and replaced
//! sites are recorded as segments so the mapping stays exact around them.

/// A position in the host source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Byte offset in the host source.
    pub pos: usize,
    /// The resolved offset belongs to text inlined from another literal.
    pub is_in_other_expression: bool,
}

/// A source range whose resolved text has a different length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSegment {
    pub source_start: usize,
    pub source_end: usize,
    pub resolved_start: usize,
    pub resolved_end: usize,
    /// Text of another literal, as opposed to a cooked escape sequence.
    pub inlined: bool,
}

/// Position mapping for one extracted literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplateInfo {
    content_start: usize,
    content_end: usize,
    own_len: usize,
    segments: Vec<MappedSegment>,
}

impl ResolvedTemplateInfo {
    /// Length of the literal's own document text. Anything past it was
    /// appended during fragment resolution.
    pub fn own_len(&self) -> usize {
        self.own_len
    }

    /// Map an offset in the resolved document text to the host source.
    pub fn source_position(&self, offset: usize) -> SourcePosition {
        if offset > self.own_len {
            return SourcePosition {
                pos: self.content_end,
                is_in_other_expression: true,
            };
        }

        let mut pos = self.content_start + offset;
        for seg in &self.segments {
            if offset < seg.resolved_start {
                break;
            }
            if offset < seg.resolved_end {
                return SourcePosition {
                    pos: seg.source_start,
                    is_in_other_expression: seg.inlined,
                };
            }
            pos = seg.source_end + (offset - seg.resolved_end);
        }

        SourcePosition {
            pos: pos.min(self.content_end),
            is_in_other_expression: false,
        }
    }

    /// Map a host source offset into the resolved document text.
    ///
    /// Returns `None` outside the literal's content or inside a replaced
    /// interpolation site. Offsets inside an escape sequence map to its
    /// cooked character.
    pub fn resolved_position(&self, source_offset: usize) -> Option<usize> {
        if source_offset < self.content_start || source_offset > self.content_end {
            return None;
        }

        let mut resolved = source_offset - self.content_start;
        for seg in &self.segments {
            if source_offset < seg.source_start {
                break;
            }
            if source_offset < seg.source_end {
                return (!seg.inlined).then_some(seg.resolved_start);
            }
            resolved = seg.resolved_end + (source_offset - seg.source_end);
        }
        Some(resolved)
    }
}

/// Builds a literal's document text together with its position mapping.
///
/// Pieces are pushed in source order starting at `content_start`.
#[derive(Debug)]
pub struct TemplateTextBuilder {
    content_start: usize,
    content_end: usize,
    source_cursor: usize,
    text: String,
    segments: Vec<MappedSegment>,
}

impl TemplateTextBuilder {
    pub fn new(content_start: usize, content_end: usize) -> Self {
        Self {
            content_start,
            content_end,
            source_cursor: content_start,
            text: String::new(),
            segments: Vec::new(),
        }
    }

    /// Append raw literal text, cooking its escape sequences.
    pub fn push_text(&mut self, raw: &str) {
        let mut rest = raw;
        while let Some(i) = rest.find('\\') {
            self.push_plain(&rest[..i]);
            let tail = &rest[i..];
            match cook_escape(tail) {
                Some((cooked, len)) => {
                    self.push_mapped(len, &cooked, false);
                    rest = &tail[len..];
                }
                None => {
                    self.push_plain("\\");
                    rest = &tail[1..];
                }
            }
        }
        self.push_plain(rest);
    }

    /// Blank out `len` bytes of an interpolation site.
    pub fn push_blank(&mut self, len: usize) {
        self.text.extend(std::iter::repeat(' ').take(len));
        self.source_cursor += len;
    }

    /// Replace the interpolation site `source_start..source_end` with `text`.
    pub fn push_substituted(&mut self, source_start: usize, source_end: usize, text: &str) {
        self.source_cursor = source_start;
        self.push_mapped(source_end - source_start, text, true);
    }

    pub fn finish(self) -> (String, ResolvedTemplateInfo) {
        let info = ResolvedTemplateInfo {
            content_start: self.content_start,
            content_end: self.content_end,
            own_len: self.text.len(),
            segments: self.segments,
        };
        (self.text, info)
    }

    fn push_plain(&mut self, text: &str) {
        self.text.push_str(text);
        self.source_cursor += text.len();
    }

    fn push_mapped(&mut self, source_len: usize, text: &str, inlined: bool) {
        let source_start = self.source_cursor;
        let resolved_start = self.text.len();
        self.text.push_str(text);
        self.segments.push(MappedSegment {
            source_start,
            source_end: source_start + source_len,
            resolved_start,
            resolved_end: self.text.len(),
            inlined,
        });
        self.source_cursor = source_start + source_len;
    }
}

/// Cook the escape sequence `rest` starts with, returning the cooked text and
/// the sequence's byte length. `None` when a tagged template would leave it
/// uncooked.
fn cook_escape(rest: &str) -> Option<(String, usize)> {
    let c = rest.get(1..)?.chars().next()?;
    let single = |cooked: &str| Some((cooked.to_string(), 1 + c.len_utf8()));
    match c {
        'n' => single("\n"),
        't' => single("\t"),
        'r' => single("\r"),
        'b' => single("\u{8}"),
        'f' => single("\u{c}"),
        'v' => single("\u{b}"),
        '0' if !rest[2..].starts_with(|d: char| d.is_ascii_digit()) => single("\0"),
        '0'..='9' => None,
        // line continuations
        '\r' if rest[2..].starts_with('\n') => Some((String::new(), 3)),
        '\r' | '\n' | '\u{2028}' | '\u{2029}' => Some((String::new(), 1 + c.len_utf8())),
        'x' => {
            let cooked = hex_char(rest.get(2..4)?)?;
            Some((cooked.to_string(), 4))
        }
        'u' if rest[2..].starts_with('{') => {
            let close = rest[3..].find('}')?;
            let cooked = hex_char(&rest[3..3 + close])?;
            Some((cooked.to_string(), 4 + close))
        }
        'u' => {
            let cooked = hex_char(rest.get(2..6)?)?;
            Some((cooked.to_string(), 6))
        }
        other => single(&rest[1..1 + other.len_utf8()]),
    }
}

fn hex_char(hex: &str) -> Option<char> {
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    char::from_u32(u32::from_str_radix(hex, 16).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LineIndex;

    #[test]
    fn test_plain_literal_maps_by_constant_shift() {
        let source = "const q = gql`query Q {\n  hello\n}`;";
        let start = source.find('`').unwrap() + 1;
        let end = source.rfind('`').unwrap();
        let mut builder = TemplateTextBuilder::new(start, end);
        builder.push_text(&source[start..end]);
        let (text, info) = builder.finish();

        let offset = text.find("hello").unwrap();
        let mapped = info.source_position(offset);
        assert!(!mapped.is_in_other_expression);
        assert_eq!(&source[mapped.pos..mapped.pos + 5], "hello");
        assert_eq!(LineIndex::new(source).line_column(mapped.pos), (2, 3));
        assert_eq!(info.resolved_position(mapped.pos), Some(offset));
    }

    #[test]
    fn test_blank_keeps_length() {
        let source = "gql`${x} query Q { a }`";
        let start = 4;
        let end = source.len() - 1;
        let mut builder = TemplateTextBuilder::new(start, end);
        builder.push_blank("${x}".len());
        builder.push_text(&source[8..end]);
        let (text, info) = builder.finish();

        assert_eq!(text.len(), end - start);
        let offset = text.find('a').unwrap();
        assert_eq!(&source[info.source_position(offset).pos..][..1], "a");
    }

    #[test]
    fn test_substituted_segment() {
        // gql`${frag}\nquery Q { ...F }`
        let source = "gql`${frag}\nquery Q { ...F }`";
        let start = 4;
        let end = source.len() - 1;
        let inlined = "fragment F on Query { hello }";

        let mut builder = TemplateTextBuilder::new(start, end);
        builder.push_substituted(4, 11, inlined);
        builder.push_text(&source[11..end]);
        let (text, info) = builder.finish();

        let inside = text.find("hello").unwrap();
        assert_eq!(
            info.source_position(inside),
            SourcePosition {
                pos: 4,
                is_in_other_expression: true
            }
        );

        let after = text.find("...F").unwrap();
        let mapped = info.source_position(after);
        assert!(!mapped.is_in_other_expression);
        assert_eq!(&source[mapped.pos..mapped.pos + 4], "...F");
        assert_eq!(info.resolved_position(mapped.pos), Some(after));
        assert_eq!(info.resolved_position(6), None);
    }

    #[test]
    fn test_escapes_are_cooked() {
        let source = r#"gql`{ f(s: "a\\b") \`x\` hello }`"#;
        let start = 4;
        let end = source.len() - 1;
        let mut builder = TemplateTextBuilder::new(start, end);
        builder.push_text(&source[start..end]);
        let (text, info) = builder.finish();

        assert_eq!(text, r#"{ f(s: "a\b") `x` hello }"#);
        let offset = text.find("hello").unwrap();
        let mapped = info.source_position(offset);
        assert!(!mapped.is_in_other_expression);
        assert_eq!(&source[mapped.pos..mapped.pos + 5], "hello");
        assert_eq!(info.resolved_position(mapped.pos), Some(offset));

        let backtick = text.find('`').unwrap();
        assert_eq!(&source[info.source_position(backtick).pos..][..2], "\\`");
    }

    #[test]
    fn test_cook_escape_sequences() {
        assert_eq!(cook_escape("\\n"), Some(("\n".to_string(), 2)));
        assert_eq!(cook_escape("\\$"), Some(("$".to_string(), 2)));
        assert_eq!(cook_escape("\\x41"), Some(("A".to_string(), 4)));
        assert_eq!(cook_escape("\\u00e9"), Some(("é".to_string(), 6)));
        assert_eq!(cook_escape("\\u{1F600}"), Some(("\u{1F600}".to_string(), 9)));
        assert_eq!(cook_escape("\\\r\n"), Some((String::new(), 3)));
        assert_eq!(cook_escape("\\01"), None);
        assert_eq!(cook_escape("\\xZZ"), None);
        assert_eq!(cook_escape("\\"), None);
    }

    #[test]
    fn test_uncooked_escape_is_kept() {
        let mut builder = TemplateTextBuilder::new(0, 6);
        builder.push_text("a\\xZZb");
        let (text, info) = builder.finish();
        assert_eq!(text, "a\\xZZb");
        assert_eq!(info.source_position(5).pos, 5);
    }

    #[test]
    fn test_appended_region_is_other_expression() {
        let mut builder = TemplateTextBuilder::new(4, 10);
        builder.push_text("{ a }");
        let (_, info) = builder.finish();

        assert!(!info.source_position(info.own_len()).is_in_other_expression);
        let appended = info.source_position(info.own_len() + 3);
        assert!(appended.is_in_other_expression);
        assert_eq!(appended.pos, 10);
    }
}
