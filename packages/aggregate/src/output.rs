//! Writing job output files.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::AggregateError;

/// Writes one line per row to `path`, replacing any previous output.
///
/// Missing parent directories are created. Returns the number of lines
/// written.
///
/// # Errors
///
/// Returns [`AggregateError::Io`] if the file cannot be created or written.
pub fn write_lines<T: Display>(path: &Path, rows: &[T]) -> Result<usize, AggregateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;

    log::debug!("Wrote {} lines to {}", rows.len(), path.display());

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrites_previous_output() {
        let dir = std::env::temp_dir().join("crime_olap_output_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("part.txt");

        write_lines(&path, &["first", "second", "third"]).unwrap();
        let written = write_lines(&path, &[1, 2]).unwrap();

        assert_eq!(written, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n2\n");

        std::fs::remove_dir_all(&dir).ok();
    }
}
