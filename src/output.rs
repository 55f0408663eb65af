//! Tabular sinks for decoded records.

use std::borrow::Cow;
use std::io::Write;

use crate::UsnJrnlResult;
use crate::record::{DecodedRecord, RECORD_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values file.
    Csv,
    /// Tab-separated values file.
    Tsv,
    /// Tab-separated rows on the console.
    Console,
}

impl OutputFormat {
    pub fn delimiter(&self) -> &'static str {
        match self {
            OutputFormat::Csv => ",",
            OutputFormat::Tsv | OutputFormat::Console => "\t",
        }
    }

    /// File extension used when the format is written to disk.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Csv => Some("csv"),
            OutputFormat::Tsv => Some("tsv"),
            OutputFormat::Console => None,
        }
    }

    fn escape<'a>(&self, field: &'a str) -> Cow<'a, str> {
        match self {
            OutputFormat::Csv => {
                if field.contains([',', '"', '\n', '\r']) {
                    Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
                } else {
                    Cow::Borrowed(field)
                }
            }
            OutputFormat::Tsv | OutputFormat::Console => {
                if field.contains(['\t', '\n', '\r']) {
                    Cow::Owned(field.replace(['\t', '\n', '\r'], " "))
                } else {
                    Cow::Borrowed(field)
                }
            }
        }
    }
}

/// Writes decoded records as delimited rows.
pub struct TabularWriter<W: Write> {
    inner: W,
    format: OutputFormat,
    rows: u64,
}

impl<W: Write> TabularWriter<W> {
    pub fn new(inner: W, format: OutputFormat) -> Self {
        TabularWriter {
            inner,
            format,
            rows: 0,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Number of records written, not counting the header.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write_header(&mut self) -> UsnJrnlResult<()> {
        self.write_row(RECORD_COLUMNS.iter().copied())
    }

    pub fn write_record(&mut self, record: &DecodedRecord) -> UsnJrnlResult<()> {
        let fields = record.fields();
        self.write_row(fields.iter().map(String::as_str))?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> UsnJrnlResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_row<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> UsnJrnlResult<()> {
        let format = self.format;
        let line = fields
            .map(|field| format.escape(field))
            .collect::<Vec<_>>()
            .join(format.delimiter());
        writeln!(self.inner, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawRecord, decode};
    use crate::tests::RecordBuilder;

    fn sample() -> DecodedRecord {
        let raw = RawRecord {
            offset: 0,
            bytes: RecordBuilder::new("test.txt").reason(0x02).build(),
        };
        decode(&raw).unwrap()
    }

    #[test]
    fn header_row() -> UsnJrnlResult<()> {
        let mut writer = TabularWriter::new(Vec::new(), OutputFormat::Csv);
        writer.write_header()?;
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "RecordSize,Version,FileReference,ParentFileReference,JournalOffset,Timestamp,\
             Reason,SourceInfo,SecurityId,FileAttributes,FilenameLength,FilenameOffset,Filename\n"
        );
        Ok(())
    }

    #[test]
    fn record_row() -> UsnJrnlResult<()> {
        let mut writer = TabularWriter::new(Vec::new(), OutputFormat::Tsv);
        writer.write_record(&sample())?;
        assert_eq!(writer.rows(), 1);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let columns: Vec<&str> = text.trim_end_matches('\n').split('\t').collect();
        assert_eq!(
            columns,
            vec![
                "80",
                "2.0",
                "1407374883555883",
                "1407374883553285",
                "0",
                "2009-11-24 08:07:09",
                "The file or directory was added to.",
                " ",
                "0",
                "ARCHIVE",
                "16",
                "60",
                "test.txt",
            ]
        );
        Ok(())
    }

    #[test]
    fn csv_quotes_fields_with_delimiters() -> UsnJrnlResult<()> {
        let mut record = sample();
        record.filename = "a,\"b\".txt".to_string();

        let mut writer = TabularWriter::new(Vec::new(), OutputFormat::Csv);
        writer.write_record(&record)?;
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.ends_with(",\"a,\"\"b\"\".txt\"\n"));
        Ok(())
    }

    #[test]
    fn tsv_replaces_tabs() -> UsnJrnlResult<()> {
        let mut record = sample();
        record.filename = "a\tb".to_string();

        let mut writer = TabularWriter::new(Vec::new(), OutputFormat::Console);
        writer.write_record(&record)?;
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.ends_with("\ta b\n"));
        assert_eq!(text.matches('\t').count(), RECORD_COLUMNS.len() - 1);
        Ok(())
    }
}
