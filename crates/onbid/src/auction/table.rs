use std::io::Read;

/// Header-addressed grid of raw CSV cells, before any typing happens.
///
/// Every row holds exactly one cell per header; short input rows are padded
/// with blanks when the table is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV input has no header row")]
    MissingHeader,
    #[error("line {line} has {found} fields but the header declares {expected}")]
    RowTooLong {
        line: u64,
        expected: usize,
        found: usize,
    },
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|header| clean_header(header).to_string())
            .collect();
        if headers.iter().all(|header| header.is_empty()) {
            return Err(TableError::MissingHeader);
        }

        let width = headers.len();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.len() > width {
                return Err(TableError::RowTooLong {
                    line: record.position().map(|pos| pos.line()).unwrap_or_default(),
                    expected: width,
                    found: record.len(),
                });
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_str(text: &str) -> Result<Self, TableError> {
        Self::from_reader(text.as_bytes())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name`, matched the way the normalizer matches headers.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = header_key(name);
        self.headers
            .iter()
            .position(|header| header_key(header) == wanted)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|cells| cells[index].as_str())
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }
}

/// Comparison key for header names: BOM and surrounding whitespace dropped,
/// ASCII case folded.
pub(crate) fn header_key(value: &str) -> String {
    clean_header(value).to_ascii_lowercase()
}

fn clean_header(value: &str) -> &str {
    value.trim_start_matches('\u{feff}').trim()
}
