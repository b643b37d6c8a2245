//! Streaming decoder for comma-delimited inventory files.
//!
//! The header is the first non-blank record. Rows arrive in batches of
//! bounded size, so a file is never held in memory whole. Records may be
//! ragged: cells past the header width are ignored and missing cells read as
//! empty. Only the three required columns are kept from each record.

use std::io::Read;

use csv::{Reader, ReaderBuilder, StringRecord};

use super::columns::{ColumnIndex, RequiredColumns, CONTENT_LENGTH};

/// Why a file could not be opened for row decoding.
#[derive(Debug)]
pub(crate) enum OpenError {
    /// A required header column is absent.
    MissingColumn(&'static str),
    /// The bytes are not decodable as delimited text.
    Decode(String),
}

type Stream = Box<dyn Read + Send>;

/// Batched row reader over one inventory file.
pub(crate) struct InventoryRows {
    reader: Reader<Stream>,
    required: RequiredColumns,
    batch_size: usize,
    record: StringRecord,
    done: bool,
}

impl InventoryRows {
    pub(crate) fn open(stream: Stream, batch_size: usize) -> Result<Self, OpenError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(stream);
        let names = match read_header(&mut reader)? {
            Some(names) => names,
            None => return Err(OpenError::MissingColumn(CONTENT_LENGTH)),
        };
        let required = ColumnIndex::from_header(names)
            .required()
            .map_err(OpenError::MissingColumn)?;

        Ok(Self {
            reader,
            required,
            batch_size: batch_size.max(1),
            record: StringRecord::new(),
            done: false,
        })
    }

    /// Decode the next batch; `None` at end of file.
    pub(crate) fn next_batch(&mut self) -> Option<Result<RowBatch, String>> {
        if self.done {
            return None;
        }
        let mut rows = Vec::with_capacity(self.batch_size);
        while rows.len() < self.batch_size {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => rows.push(OwnedRow::project(&self.record, &self.required)),
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.to_string()));
                }
            }
        }
        if rows.is_empty() {
            None
        } else {
            Some(Ok(RowBatch { rows }))
        }
    }
}

/// Required cells of one record, copied out of the reader's buffer.
struct OwnedRow {
    content_length: String,
    access_tier: String,
    metadata: String,
}

impl OwnedRow {
    fn project(record: &StringRecord, required: &RequiredColumns) -> Self {
        let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        Self {
            content_length: cell(required.content_length),
            access_tier: cell(required.access_tier),
            metadata: cell(required.metadata),
        }
    }
}

/// One decoded batch of rows.
pub(crate) struct RowBatch {
    rows: Vec<OwnedRow>,
}

impl RowBatch {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Raw cells of row `idx`.
    pub(crate) fn row(&self, idx: usize) -> RawRow<'_> {
        let row = &self.rows[idx];
        RawRow {
            content_length: &row.content_length,
            access_tier: &row.access_tier,
            metadata: &row.metadata,
        }
    }
}

/// Undecoded cells of the required columns for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawRow<'a> {
    pub content_length: &'a str,
    pub access_tier: &'a str,
    pub metadata: &'a str,
}

impl RawRow<'_> {
    /// Rows with nothing in any required column are padding, not objects.
    pub(crate) fn is_blank(&self) -> bool {
        self.content_length.trim().is_empty()
            && self.access_tier.trim().is_empty()
            && self.metadata.trim().is_empty()
    }
}

/// Read records until one with content and return its cells as column names.
/// A leading byte-order mark is dropped. Returns `None` at EOF.
fn read_header(reader: &mut Reader<Stream>) -> Result<Option<Vec<String>>, OpenError> {
    let mut record = StringRecord::new();
    let mut first = true;
    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|e| OpenError::Decode(e.to_string()))?;
        if !more {
            return Ok(None);
        }
        let mut names: Vec<String> = record.iter().map(str::to_string).collect();
        if first {
            if let Some(name) = names.first_mut() {
                if let Some(stripped) = name.strip_prefix('\u{feff}') {
                    *name = stripped.to_string();
                }
            }
            first = false;
        }
        if names.iter().any(|name| !name.trim().is_empty()) {
            return Ok(Some(names));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn open(content: &str, batch_size: usize) -> Result<InventoryRows, OpenError> {
        let stream: Stream = Box::new(Cursor::new(content.as_bytes().to_vec()));
        InventoryRows::open(stream, batch_size)
    }

    fn collect(rows: &mut InventoryRows) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        while let Some(batch) = rows.next_batch() {
            let batch = batch.unwrap();
            for idx in 0..batch.len() {
                let row = batch.row(idx);
                out.push((
                    row.content_length.to_string(),
                    row.access_tier.to_string(),
                    row.metadata.to_string(),
                ));
            }
        }
        out
    }

    #[test]
    fn test_projects_required_columns_in_order() {
        let mut rows = open(
            "Name,Metadata,AccessTier,Content-Length\na.txt,{},Hot,100\n",
            16,
        )
        .unwrap();
        assert_eq!(
            collect(&mut rows),
            vec![("100".into(), "Hot".into(), "{}".into())]
        );
    }

    #[test]
    fn test_quoted_metadata_is_unescaped() {
        let mut rows = open(
            "Content-Length,AccessTier,Metadata\n200,Cool,\"{\"\"documentType\"\":\"\"invoice\"\"}\"\n",
            16,
        )
        .unwrap();
        let decoded = collect(&mut rows);
        assert_eq!(decoded[0].2, r#"{"documentType":"invoice"}"#);
    }

    #[test]
    fn test_leading_blank_lines_and_bom_before_header() {
        let mut rows = open(
            "\u{feff}\n\n\"Content-Length\",AccessTier,Metadata\n5,Hot,\n",
            16,
        )
        .unwrap();
        assert_eq!(collect(&mut rows), vec![("5".into(), "Hot".into(), "".into())]);
    }

    #[test]
    fn test_bom_on_header_line() {
        let mut rows = open("\u{feff}Content-Length,AccessTier,Metadata\n5,Hot,\n", 16).unwrap();
        assert_eq!(collect(&mut rows).len(), 1);
    }

    #[test]
    fn test_small_batches_cover_all_rows() {
        let mut body = String::from("Content-Length,AccessTier,Metadata\n");
        for i in 0..25 {
            body.push_str(&format!("{i},Hot,\n"));
        }
        let mut rows = open(&body, 4).unwrap();
        let mut batches = 0;
        let mut total = 0;
        while let Some(batch) = rows.next_batch() {
            let batch = batch.unwrap();
            assert!(batch.len() <= 4);
            total += batch.len();
            batches += 1;
        }
        assert_eq!(total, 25);
        assert_eq!(batches, 7);
    }

    #[test]
    fn test_short_rows_are_padded_and_blank() {
        let mut rows = open("Content-Length,AccessTier,Metadata\n   \n", 16).unwrap();
        let batch = rows.next_batch().unwrap().unwrap();
        assert!(batch.row(0).is_blank());
    }

    #[test]
    fn test_ragged_rows_keep_required_cells() {
        let mut rows = open(
            "Content-Length,AccessTier,Metadata\n100,Hot,{},extra\n200,Cool,{},\n300\n",
            16,
        )
        .unwrap();
        assert_eq!(
            collect(&mut rows),
            vec![
                ("100".into(), "Hot".into(), "{}".into()),
                ("200".into(), "Cool".into(), "{}".into()),
                ("300".into(), "".into(), "".into()),
            ]
        );
    }

    #[test]
    fn test_missing_column_is_reported() {
        match open("Content-Length,Metadata\n1,{}\n", 16) {
            Err(OpenError::MissingColumn(name)) => assert_eq!(name, "AccessTier"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_file_has_no_header() {
        match open("\n\n", 16) {
            Err(OpenError::MissingColumn(name)) => assert_eq!(name, CONTENT_LENGTH),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let stream: Stream = Box::new(Cursor::new(
            b"Content-Length,AccessTier,Metadata\n1,\xff\xfe,{}\n".to_vec(),
        ));
        let mut rows = InventoryRows::open(stream, 16).unwrap();
        assert!(matches!(rows.next_batch(), Some(Err(_))));
    }
}
