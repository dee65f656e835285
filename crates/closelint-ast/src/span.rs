// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source location tracking.

/// A half-open byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Line-start table for byte offset -> line:column lookups.
///
/// Columns count bytes from the start of the line, which matches characters
/// for the ASCII sources the fixtures use.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Byte offset of the start of each line. `line_starts[0]` is always 0.
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| (i + 1) as u32),
        );
        LineMap { line_starts }
    }

    /// Convert a byte offset to `(line, column)`, both 1-based.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset as u32;
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = offset - self.line_starts[line_idx] + 1;
        (line_idx + 1, col as usize)
    }

    /// Text of a 1-based line, without its trailing newline.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> Option<&'a str> {
        let idx = line.checked_sub(1)?;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| (s as usize).saturating_sub(1))
            .unwrap_or(source.len());
        source.get(start..end).map(|l| l.trim_end_matches('\r'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source() {
        let lm = LineMap::new("");
        assert_eq!(lm.line_col(0), (1, 1));
        assert_eq!(lm.line_text("", 2), None);
    }

    #[test]
    fn method_selector_column() {
        let src = "fun test() {\n    reader.readLines()\n}";
        let lm = LineMap::new(src);
        let offset = src.find("readLines").unwrap();
        assert_eq!(lm.line_col(offset), (2, 12));
        assert_eq!(lm.line_text(src, 2), Some("    reader.readLines()"));
        assert_eq!(lm.line_text(src, 4), None);
    }

    #[test]
    fn offset_at_newline_belongs_to_its_line() {
        let src = "ab\ncd\n";
        let lm = LineMap::new(src);
        assert_eq!(lm.line_col(2), (1, 3));
        assert_eq!(lm.line_col(3), (2, 1));
        assert_eq!(lm.line_text(src, 3), Some(""));
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let src = "val a = 1\r\nval b = 2";
        let lm = LineMap::new(src);
        assert_eq!(lm.line_text(src, 1), Some("val a = 1"));
        assert_eq!(lm.line_col(src.find("val b").unwrap()), (2, 1));
    }

    #[test]
    fn span_helpers() {
        let a = Span::new(4, 9);
        let b = Span::new(7, 15);
        assert_eq!(a.to(b), Span::new(4, 15));
        assert_eq!(a.len(), 5);
        assert!(a.to(b).contains(a));
        assert!(!a.contains(b));
        assert!(Span::new(3, 3).is_empty());
    }
}
