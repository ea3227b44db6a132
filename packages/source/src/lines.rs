//! Line-at-a-time reading of incident exports and job outputs.
//!
//! Lines are yielded as raw bytes so that an encoding error in one line is
//! reported by the column extractor for that line only, instead of ending
//! the whole read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::SourceError;

/// Iterator over the newline-terminated lines of a reader.
///
/// Line endings are removed. Each item is the line's raw bytes.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    /// Wraps an already-buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl LineReader<BufReader<File>> {
    /// Opens `path` for line reading.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if the path does not exist and
    /// [`SourceError::Io`] if it cannot be opened.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound {
                path: path.display().to_string(),
            });
        }
        let file = File::open(path)?;
        log::debug!("Opened {} for reading", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = Result<Vec<u8>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let mut line = std::mem::take(&mut self.buf);
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(SourceError::Io(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_lines_without_endings() {
        let input: &[u8] = b"first\r\nsecond\nthird";
        let lines: Vec<Vec<u8>> = LineReader::new(input).map(Result::unwrap).collect();
        assert_eq!(
            lines,
            vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
        );
    }

    #[test]
    fn keeps_invalid_utf8_lines_for_the_caller() {
        let input: &[u8] = b"ok\n\xff\nok again\n";
        let lines: Vec<Vec<u8>> = LineReader::new(input).map(Result::unwrap).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], vec![0xff]);
    }

    #[test]
    fn reports_missing_file() {
        let path = std::env::temp_dir().join("crime_olap_source_missing_input.csv");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            LineReader::open(&path),
            Err(SourceError::NotFound { .. })
        ));
    }
}
