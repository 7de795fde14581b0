//! Byte offset <-> line/column conversion.

/// Line start table for a text.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    /// 1-based (line, column) of a byte offset. Offsets past the end clamp.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line + 1, column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("query { hello }");
        assert_eq!(index.line_column(0), (1, 1));
        assert_eq!(index.line_column(8), (1, 9));
    }

    #[test]
    fn test_multi_line() {
        let text = "query {\n  hello\n}";
        let index = LineIndex::new(text);
        assert_eq!(index.line_column(10), (2, 3));
        assert_eq!(&text[10..15], "hello");
        assert_eq!(index.line_column(16), (3, 1));
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.line_column(100), (2, 3));
    }

    #[test]
    fn test_columns_count_characters() {
        let index = LineIndex::new("\"ééé\" x");
        assert_eq!(index.line_column(9), (1, 7));
    }
}
