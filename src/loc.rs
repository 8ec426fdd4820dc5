use std::sync::Arc;

/// A [`Span`] tracks where a symbol came from in the definition file.
/// Lines and columns start at 1. `col_end` is the column of the last character,
/// so a one-character symbol has `col_start == col_end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub col_start: u32,
    pub col_end: u32,
}

impl Span {
    pub fn new(line: u32, col_start: u32, col_end: u32) -> Span {
        Span { line, col_start, col_end }
    }

    /// When the location of something is unknown, you can use this.
    pub fn unknown() -> Span {
        Span::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }

    /// The span from the start of `self` to the end of `other`.
    /// Spans can't cross lines, so if `other` is on another line this is just `self`.
    pub fn to(&self, other: Span) -> Span {
        if self.line == other.line && other.col_end >= self.col_start {
            Span::new(self.line, self.col_start, other.col_end)
        } else {
            *self
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}:{}", self.line, self.col_start)
    }
}

/// Many objects have location information.
/// [`HasSpan`] allows you to call [`HasSpan::span`] to get it.
pub trait HasSpan {
    fn span(&self) -> Span;
}

#[derive(Clone, Debug)]
pub enum Source {
    File(Arc<std::path::PathBuf>),
    String,
    Unknown,
}

/// A [`SourceInfo`] keeps the text of a definition file around
/// so diagnostics can quote the offending line.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    source: Source,
    lines: Vec<String>,
}

impl SourceInfo {
    pub fn unknown() -> SourceInfo {
        SourceInfo {
            source: Source::Unknown,
            lines: vec![],
        }
    }

    pub fn from_file(filepath: &std::path::Path, contents: &str) -> SourceInfo {
        SourceInfo {
            source: Source::File(Arc::new(filepath.to_owned())),
            lines: split_lines(contents),
        }
    }

    pub fn from_string(contents: &str) -> SourceInfo {
        SourceInfo {
            source: Source::String,
            lines: split_lines(contents),
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The text of line `line`, counting from 1.
    pub fn line(&self, line: u32) -> Option<&str> {
        let index = (line as usize).checked_sub(1)?;
        self.lines.get(index).map(|line| line.as_str())
    }

    /// The line `span` sits on, followed by a second line marking the span with carets.
    pub fn underline(&self, span: Span) -> Option<String> {
        let text = self.line(span.line)?;
        let start = span.col_start.max(1) as usize;
        let end = span.col_end.max(span.col_start).max(1) as usize;
        // keep tabs so the carets line up under the source text
        let mut marker: String = text
            .chars()
            .take(start - 1)
            .map(|ch| if ch == '\t' { '\t' } else { ' ' })
            .collect();
        while marker.chars().count() < start - 1 {
            marker.push(' ');
        }
        marker.push_str(&"^".repeat(end - start + 1));
        Some(format!("{text}\n{marker}"))
    }
}

fn split_lines(contents: &str) -> Vec<String> {
    contents.split('\n').map(|line| line.trim_end_matches('\r').to_string()).collect()
}

#[test]
fn underline() {
    let text = "SWITCH 1 SW1;
AND 17 G1;
CONNECT SW1 > G1.I1;";

    let source_info = SourceInfo::from_string(text);
    assert_eq!(source_info.line(2), Some("AND 17 G1;"));
    assert_eq!(source_info.line(0), None);
    assert_eq!(source_info.line(4), None);

    let underlined = source_info.underline(Span::new(2, 5, 6)).unwrap();
    assert_eq!(underlined, "AND 17 G1;\n    ^^");

    let underlined = source_info.underline(Span::new(3, 13, 13)).unwrap();
    assert_eq!(underlined, "CONNECT SW1 > G1.I1;\n            ^");
}
