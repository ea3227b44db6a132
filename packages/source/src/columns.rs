//! Splits one delimited-text line into its ordered fields.
//!
//! Quoting follows RFC 4180: a field that starts with `"` runs until the
//! next unpaired `"`, and `""` inside it is an escaped quote. Quotes inside
//! an unquoted field are kept literally.

use crate::SourceError;

/// Stateless field splitter for single incident lines.
#[derive(Debug, Clone, Copy)]
pub struct ColumnExtractor {
    /// Field delimiter byte (defaults to `,`).
    delimiter: u8,
}

impl Default for ColumnExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnExtractor {
    /// Creates a comma-delimited extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Sets the field delimiter (e.g. `b'\t'` for TSV files).
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Splits `line` into fields.
    ///
    /// # Errors
    ///
    /// See [`Self::extract_bytes`].
    pub fn extract(&self, line: &str) -> Result<Vec<String>, SourceError> {
        self.extract_bytes(line.as_bytes())
    }

    /// Splits a raw line into fields, validating UTF-8 along the way.
    ///
    /// A trailing `\n` or `\r\n` is ignored. Records end only at `\n`, so
    /// a bare `\r` inside the line stays part of its field.
    ///
    /// # Errors
    ///
    /// * [`SourceError::EmptyLine`] if the line is blank.
    /// * [`SourceError::UnterminatedQuote`] if a quoted field never closes.
    /// * [`SourceError::Csv`] if the reader rejects the line, e.g. because
    ///   a field is not valid UTF-8.
    pub fn extract_bytes(&self, line: &[u8]) -> Result<Vec<String>, SourceError> {
        let line = trim_line_ending(line);

        if line.iter().all(u8::is_ascii_whitespace) {
            return Err(SourceError::EmptyLine);
        }

        if has_unterminated_quote(line, self.delimiter) {
            return Err(SourceError::UnterminatedQuote {
                line: String::from_utf8_lossy(line).into_owned(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_reader(line);

        let mut record = csv::StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Err(SourceError::EmptyLine);
        }

        Ok(record.iter().map(str::to_owned).collect())
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn has_unterminated_quote(line: &[u8], delimiter: u8) -> bool {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut bytes = line.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        if in_quotes {
            if b == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    in_quotes = false;
                }
            }
        } else if b == delimiter {
            at_field_start = true;
            continue;
        } else if b == b'"' && at_field_start {
            in_quotes = true;
        }
        at_field_start = false;
    }

    in_quotes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_fields() {
        let fields = ColumnExtractor::new()
            .extract("150060275,NON-CRIMINAL,LOST PROPERTY,Monday,01/19/2015,14:00,MISSION")
            .unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[1], "NON-CRIMINAL");
        assert_eq!(fields[6], "MISSION");
    }

    #[test]
    fn honours_quoted_fields_with_commas_and_escapes() {
        let fields = ColumnExtractor::new()
            .extract(r#"1,"WEAPON LAWS","POSS OF ""DEADLY"" WEAPON, W/INTENT",Friday"#)
            .unwrap();
        assert_eq!(
            fields,
            vec![
                "1",
                "WEAPON LAWS",
                r#"POSS OF "DEADLY" WEAPON, W/INTENT"#,
                "Friday"
            ]
        );
    }

    #[test]
    fn strips_line_endings() {
        let fields = ColumnExtractor::new().extract_bytes(b"a,b\r\n").unwrap();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn bare_carriage_return_does_not_split_the_line() {
        let fields = ColumnExtractor::new()
            .extract("1,ASSAULT\rX,x,Mon,01/05/2015,t,NOR\rTH")
            .unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[1], "ASSAULT\rX");
        assert_eq!(fields[6], "NOR\rTH");
    }

    #[test]
    fn rejects_unterminated_quote() {
        let err = ColumnExtractor::new()
            .extract(r#"1,"ASSAULT,Monday"#)
            .unwrap_err();
        assert!(matches!(err, SourceError::UnterminatedQuote { .. }));
    }

    #[test]
    fn keeps_literal_quote_inside_unquoted_field() {
        let fields = ColumnExtractor::new().extract(r#"5" ruler,x"#).unwrap();
        assert_eq!(fields, vec![r#"5" ruler"#, "x"]);
    }

    #[test]
    fn rejects_blank_line() {
        assert!(matches!(
            ColumnExtractor::new().extract("  "),
            Err(SourceError::EmptyLine)
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = ColumnExtractor::new()
            .extract_bytes(b"ok,\xff\xfe,fine")
            .unwrap_err();
        assert!(matches!(err, SourceError::Csv(_)));
    }

    #[test]
    fn supports_tab_delimiter() {
        let fields = ColumnExtractor::new()
            .with_delimiter(b'\t')
            .extract("LARCENY/THEFT\t1,2,3")
            .unwrap();
        assert_eq!(fields, vec!["LARCENY/THEFT", "1,2,3"]);
    }
}
