//! Line-oriented document model
//!
//! A config file is held as an ordered sequence of line records. Each record
//! is either a directive or an opaque comment/blank line. Comments keep their
//! physical position but are invisible to every editing engine, which only
//! walks [`Document::directives`].
//!
//! Lines read from a file are identified by their original 0-based position.
//! Lines inserted afterwards get fresh ids above any id handed out so far, so
//! an id stays valid for the lifetime of the document even when neighbouring
//! lines come and go.

use crate::error::{IetError, IetResult};
use std::fmt;

/// Stable identifier of a line within one [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(usize);

impl LineId {
    pub fn new(index: usize) -> Self {
        LineId(index)
    }

    /// Underlying index (original line position for parsed lines)
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Meaningful content: a global option, target definition, option or ACL
    Directive,
    /// Blank line or any line containing `#`
    Comment,
}

impl LineKind {
    /// Classify a raw line.
    ///
    /// The whole line counts as a comment as soon as it contains `#`; there is
    /// no notion of a trailing comment after real content.
    pub fn classify(line: &str) -> Self {
        if line.trim().is_empty() || line.contains('#') {
            LineKind::Comment
        } else {
            LineKind::Directive
        }
    }
}

/// Where a line inserted without a known position is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// First physical line of the file
    Start,
    /// Last physical line of the file
    #[default]
    End,
    /// Directly after an existing line
    After(LineId),
    /// Directly before an existing line
    Before(LineId),
}

/// A single physical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    id: LineId,
    kind: LineKind,
    text: String,
}

impl Line {
    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_directive(&self) -> bool {
        self.kind == LineKind::Directive
    }
}

/// In-memory config document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Line>,
    next_id: usize,
    trailing_newline: bool,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Split raw file text into line records
    pub fn parse(text: &str) -> Self {
        let (body, trailing_newline) = match text.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (text, false),
        };

        // A lone "\n" is carried entirely by the trailing terminator
        let lines: Vec<Line> = if body.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .enumerate()
                .map(|(index, text)| Line {
                    id: LineId(index),
                    kind: LineKind::classify(text),
                    text: text.to_string(),
                })
                .collect()
        };

        let directives = lines.iter().filter(|l| l.is_directive()).count();
        log::debug!(
            "Parsed {} lines ({} directives, {} comments)",
            lines.len(),
            directives,
            lines.len() - directives
        );

        Document {
            next_id: lines.len(),
            lines,
            trailing_newline,
        }
    }

    /// Merge directives and comments back into file text
    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// All lines in physical order
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Directive lines in physical order
    pub fn directives(&self) -> impl Iterator<Item = (LineId, &str)> {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Directive)
            .map(|l| (l.id, l.text.as_str()))
    }

    /// Comment and blank lines in physical order
    pub fn comments(&self) -> impl Iterator<Item = (LineId, &str)> {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Comment)
            .map(|l| (l.id, l.text.as_str()))
    }

    /// Number of physical lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Check whether the document holds at least one directive
    pub fn has_content(&self) -> bool {
        self.lines.iter().any(Line::is_directive)
    }

    pub fn get(&self, id: LineId) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.text.as_str())
    }

    /// Id of the first directive whose first token is `Target`
    pub fn first_target(&self) -> Option<LineId> {
        self.directives()
            .find(|(_, text)| first_token(text) == Some("Target"))
            .map(|(id, _)| id)
    }

    /// Overwrite the text of an existing line
    pub fn replace(&mut self, id: LineId, text: impl Into<String>) -> IetResult<()> {
        let text = text.into();
        check_single_line(&text)?;

        let pos = self.position(id)?;
        let line = &mut self.lines[pos];
        log::debug!("Line {}: {:?} -> {:?}", id, line.text, text);
        line.kind = LineKind::classify(&text);
        line.text = text;
        Ok(())
    }

    /// Remove a line, returning its text
    pub fn remove(&mut self, id: LineId) -> IetResult<String> {
        let pos = self.position(id)?;
        let line = self.lines.remove(pos);
        log::debug!("Line {} removed: {:?}", id, line.text);
        Ok(line.text)
    }

    /// Insert a new line and return its id
    pub fn insert(&mut self, text: impl Into<String>, placement: Placement) -> IetResult<LineId> {
        let text = text.into();
        check_single_line(&text)?;

        let pos = match placement {
            Placement::Start => 0,
            Placement::End => self.lines.len(),
            Placement::After(anchor) => self.position(anchor)? + 1,
            Placement::Before(anchor) => self.position(anchor)?,
        };

        let id = LineId(self.next_id);
        self.next_id += 1;

        log::debug!("Line {} inserted at position {}: {:?}", id, pos, text);
        self.lines.insert(
            pos,
            Line {
                id,
                kind: LineKind::classify(&text),
                text,
            },
        );
        Ok(id)
    }

    fn position(&self, id: LineId) -> IetResult<usize> {
        self.lines
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| IetError::NotFound(format!("line {} is not part of the document", id)))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// First whitespace-delimited token of a line
pub(crate) fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// IQNs are a single token and must not start a comment
pub(crate) fn check_iqn(iqn: &str) -> IetResult<()> {
    if iqn.is_empty() || iqn.contains('#') || iqn.chars().any(char::is_whitespace) {
        return Err(IetError::Invalid(format!("{:?} is not a valid IQN", iqn)));
    }
    Ok(())
}

fn check_single_line(text: &str) -> IetResult<()> {
    if text.contains('\n') || text.contains('\r') {
        return Err(IetError::Invalid(format!(
            "line must not contain a line break: {:?}",
            text
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Example iscsi target configuration
IncomingUser joe secret

Target iqn.2001-04.com.example:storage.disk1
    # Lun definition
    Lun 0 Path=/dev/sdc,Type=fileio
    MaxConnections 1
";

    #[test]
    fn test_roundtrip_without_changes() {
        for text in [SAMPLE, "", "\n", "\n\n", "Target iqn.a", "a\n\n# c\n\nb"] {
            assert_eq!(Document::parse(text).render(), text);
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(LineKind::classify(""), LineKind::Comment);
        assert_eq!(LineKind::classify("   \t"), LineKind::Comment);
        assert_eq!(LineKind::classify("  # note"), LineKind::Comment);
        assert_eq!(LineKind::classify("MaxConnections 1 # inline"), LineKind::Comment);
        assert_eq!(LineKind::classify("MaxConnections 1"), LineKind::Directive);
    }

    #[test]
    fn test_directives_and_comments_are_disjoint() {
        let doc = Document::parse(SAMPLE);
        let directives: Vec<_> = doc.directives().map(|(id, _)| id.get()).collect();
        let comments: Vec<_> = doc.comments().map(|(id, _)| id.get()).collect();

        assert_eq!(directives, vec![1, 3, 5, 6]);
        assert_eq!(comments, vec![0, 2, 4]);
        assert_eq!(doc.get(LineId::new(3)), Some("Target iqn.2001-04.com.example:storage.disk1"));
    }

    #[test]
    fn test_first_target() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(doc.first_target(), Some(LineId::new(3)));
        assert_eq!(Document::parse("IncomingUser a b").first_target(), None);
    }

    #[test]
    fn test_insert_placements() {
        let mut doc = Document::parse("a\nb\n");
        let b = LineId::new(1);

        let start = doc.insert("first", Placement::Start).unwrap();
        doc.insert("last", Placement::End).unwrap();
        doc.insert("after-b", Placement::After(b)).unwrap();
        doc.insert("before-b", Placement::Before(b)).unwrap();

        assert_eq!(doc.render(), "first\na\nbefore-b\nb\nafter-b\nlast\n");
        // Fresh ids never collide with parsed ones
        assert_eq!(start, LineId::new(2));
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut doc = Document::parse("a\nb");
        doc.remove(LineId::new(1)).unwrap();
        let id = doc.insert("c", Placement::End).unwrap();
        assert_eq!(id, LineId::new(2));
        assert_eq!(doc.render(), "a\nc");
    }

    #[test]
    fn test_replace_reclassifies() {
        let mut doc = Document::parse("a\nb");
        doc.replace(LineId::new(0), "# a").unwrap();
        assert_eq!(doc.directives().count(), 1);
        assert_eq!(doc.render(), "# a\nb");
    }

    #[test]
    fn test_unknown_line_is_not_found() {
        let mut doc = Document::parse("a");
        assert!(doc.remove(LineId::new(7)).unwrap_err().is_not_found());
        assert!(doc.replace(LineId::new(7), "x").is_err());
        assert!(doc.insert("x", Placement::After(LineId::new(7))).is_err());
    }

    #[test]
    fn test_multiline_text_rejected() {
        let mut doc = Document::new();
        let err = doc.insert("a\nb", Placement::End).unwrap_err();
        assert!(matches!(err, IetError::Invalid(_)));
    }

    #[test]
    fn test_insert_into_empty_document() {
        let mut doc = Document::parse("");
        doc.insert("Authentication no", Placement::Start).unwrap();
        assert_eq!(doc.render(), "Authentication no");
    }
}
