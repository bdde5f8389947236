//=====================================================
// File: source/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript source buffers and locations
// Objective: Own script text with a line-start index and convert between
//            byte offsets and 1-based (line, column) pairs
//=====================================================

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

//=====================================================
//            Section 1: Source Errors
//=====================================================

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Line number out of range: {0}")]
    LineOutOfRange(usize),
    #[error("Column number out of range: {column} (line {line})")]
    ColumnOutOfRange { line: usize, column: usize },
    #[error("Offset out of range: {0}")]
    OffsetOutOfRange(usize),
}

//=====================================================
//            Section 2: Source File
//=====================================================

/// Immutable script text plus its display name and line-start index.
#[derive(Debug)]
pub struct SourceFile {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    //Function: from_path
    //Purpose: Read a script from disk and index its lines
    //Inputs: path: impl AsRef<Path>
    //Returns: Result<SourceFile, SourceError>
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_string(text, path.display().to_string()))
    }

    pub fn from_string(text: impl Into<String>, name: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = index_lines(&text);
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns line `number` (1-based) without its trailing `\n` or `\r\n`.
    pub fn line(&self, number: usize) -> Result<&str, SourceError> {
        if number == 0 || number > self.line_starts.len() {
            return Err(SourceError::LineOutOfRange(number));
        }
        let start = self.line_starts[number - 1];
        let end = self
            .line_starts
            .get(number)
            .copied()
            .unwrap_or(self.text.len());
        let raw = &self.text[start..end];
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        Ok(raw.strip_suffix('\r').unwrap_or(raw))
    }

    /// Converts a 1-based (line, column) pair into a byte offset. Columns
    /// count characters, the same unit the lexer uses.
    pub fn position(&self, line: usize, column: usize) -> Result<usize, SourceError> {
        let text = self.line(line)?;
        // Column one past the last character addresses the line terminator.
        let within = column.checked_sub(1).and_then(|skip| {
            text.char_indices()
                .map(|(index, _)| index)
                .chain(std::iter::once(text.len()))
                .nth(skip)
        });
        within
            .map(|within| self.line_starts[line - 1] + within)
            .ok_or(SourceError::ColumnOutOfRange { line, column })
    }

    /// Converts a byte offset into a 1-based (line, column) pair. The offset
    /// must fall on a character boundary.
    pub fn line_and_column(&self, offset: usize) -> Result<(usize, usize), SourceError> {
        if offset > self.text.len() {
            return Err(SourceError::OffsetOutOfRange(offset));
        }
        // Index of the last line start that is <= offset.
        let line_index = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let prefix = self
            .text
            .get(self.line_starts[line_index]..offset)
            .ok_or(SourceError::OffsetOutOfRange(offset))?;
        Ok((line_index + 1, prefix.chars().count() + 1))
    }
}

fn index_lines(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, byte)| *byte == b'\n')
            .map(|(index, _)| index + 1),
    );
    starts
}

//=============================================/*
//  Line starts are computed once; lookups are binary searches.
//============================================*/
//=====================================================
//            Section 3: Source Location
//=====================================================

/// A point in a source buffer. Lines and columns are 1-based.
#[derive(Clone, Default)]
pub struct SourceLocation {
    pub source: Option<Rc<SourceFile>>,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(source: Rc<SourceFile>, line: usize, column: usize, offset: usize) -> Self {
        Self {
            source: Some(source),
            line,
            column,
            offset,
        }
    }

    /// A location that points nowhere.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.source.is_some() && self.line >= 1 && self.column >= 1
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().map(SourceFile::name)
    }
}

impl PartialEq for SourceLocation {
    fn eq(&self, other: &Self) -> bool {
        let same_source = match (&self.source, &other.source) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b) || a.name() == b.name(),
            (None, None) => true,
            _ => false,
        };
        same_source
            && self.line == other.line
            && self.column == other.column
            && self.offset == other.offset
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source_name() {
            Some(name) if self.is_valid() => write!(f, "{}:{}:{}", name, self.line, self.column),
            _ => write!(f, "<unknown location>"),
        }
    }
}

// Debug stays compact so AST dumps do not repeat the whole source text.
impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

//=====================================================
//            Section 4: Unit Tests
//=====================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_line_extraction_strips_terminators() {
        let file = SourceFile::from_string("first\r\nsecond\nthird", "demo.chs");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line(1).unwrap(), "first");
        assert_eq!(file.line(2).unwrap(), "second");
        assert_eq!(file.line(3).unwrap(), "third");
        assert!(matches!(file.line(0), Err(SourceError::LineOutOfRange(0))));
        assert!(matches!(file.line(4), Err(SourceError::LineOutOfRange(4))));
    }

    #[test]
    fn test_offset_round_trip() {
        let file = SourceFile::from_string("ab\ncde\n\nf", "demo.chs");
        for offset in 0..=file.len() {
            let (line, column) = file.line_and_column(offset).unwrap();
            assert_eq!(file.position(line, column).unwrap(), offset);
        }
        assert_eq!(file.line_and_column(3).unwrap(), (2, 1));
        assert_eq!(file.line_and_column(file.len()).unwrap(), (4, 2));
        assert!(file.line_and_column(file.len() + 1).is_err());
    }

    #[test]
    fn test_column_out_of_range() {
        let file = SourceFile::from_string("abc\n", "demo.chs");
        assert!(file.position(1, 4).is_ok());
        assert!(matches!(
            file.position(1, 5),
            Err(SourceError::ColumnOutOfRange { line: 1, column: 5 })
        ));
        assert!(file.position(1, 0).is_err());
    }

    #[test]
    fn test_columns_count_characters() {
        let file = SourceFile::from_string("\"héllo\" x;\nπ", "demo.chs");
        assert_eq!(file.line_and_column(9).unwrap(), (1, 9));
        assert_eq!(file.position(1, 9).unwrap(), 9);
        assert_eq!(file.line_and_column(file.len()).unwrap(), (2, 2));
        assert!(matches!(
            file.line_and_column(3),
            Err(SourceError::OffsetOutOfRange(3))
        ));
        for (offset, _) in file.text().char_indices() {
            let (line, column) = file.line_and_column(offset).unwrap();
            assert_eq!(file.position(line, column).unwrap(), offset);
        }
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        write!(temp, "DECLARE CONF x : INT = 1;").unwrap();
        let file = SourceFile::from_path(temp.path()).unwrap();
        assert_eq!(file.text(), "DECLARE CONF x : INT = 1;");
        assert_eq!(file.name(), temp.path().display().to_string());
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let err = SourceFile::from_path("/definitely/not/here.chs").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().starts_with("Failed to open file"));
    }

    #[test]
    fn test_location_rendering() {
        let file = Rc::new(SourceFile::from_string("x", "demo.chs"));
        let location = SourceLocation::new(file, 3, 7, 12);
        assert!(location.is_valid());
        assert_eq!(location.to_string(), "demo.chs:3:7");
        assert_eq!(SourceLocation::unknown().to_string(), "<unknown location>");
        assert!(!SourceLocation::unknown().is_valid());
    }
}

//=====================================================
// End of file
//=====================================================
