//! Reading the key column of tab-delimited job reports.
//!
//! The weekly frequency jobs write one `KEY\tSUMMARY` line per category or
//! district. Later stages only need the set of keys, which this module
//! extracts in file order. Sorting and deduplication belong to the catalog.

use std::path::Path;

use crate::SourceError;
use crate::lines::LineReader;

/// Extracts field 0 of every tab-delimited line in `path`.
///
/// Blank lines and lines with an empty key are skipped.
///
/// # Errors
///
/// Returns [`SourceError`] if the report cannot be opened or read.
pub fn read_report_keys(path: &Path) -> Result<Vec<String>, SourceError> {
    let mut keys = Vec::new();

    for line in LineReader::open(path)? {
        let line = line?;
        let text = String::from_utf8_lossy(&line);
        let key = text.split('\t').next().unwrap_or_default();
        if key.trim().is_empty() {
            continue;
        }
        keys.push(key.to_string());
    }

    log::debug!("Read {} keys from {}", keys.len(), path.display());

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_tab_field() {
        let path = std::env::temp_dir().join("crime_olap_source_report_keys.txt");
        std::fs::write(
            &path,
            "WARRANTS\t1,2,3\nASSAULT\t0,0,1\n\nVANDALISM\n\t9,9\n",
        )
        .unwrap();

        let keys = read_report_keys(&path).unwrap();
        assert_eq!(keys, vec!["WARRANTS", "ASSAULT", "VANDALISM"]);

        std::fs::remove_file(&path).ok();
    }
}
