use super::table::{RawTable, TableError};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UPLOAD_ORIGIN: &str = "upload";

/// Text encodings the loader knows how to read CSV exports in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8Sig,
    Utf8,
    /// Korean Windows code page, read through the WHATWG EUC-KR decoder.
    Cp949,
}

/// Order in which encodings are tried for files on disk.
pub const DEFAULT_ENCODINGS: [TextEncoding; 3] =
    [TextEncoding::Utf8Sig, TextEncoding::Utf8, TextEncoding::Cp949];

impl TextEncoding {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Utf8Sig => "utf-8-sig",
            Self::Utf8 => "utf-8",
            Self::Cp949 => "cp949",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_owned)
            }
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Self::Cp949 => encoding_rs::EUC_KR
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(
        "no case data found (checked {count} candidate path(s)); upload a CSV instead",
        count = .candidates.len()
    )]
    NoData { candidates: Vec<PathBuf> },
    #[error("failed to read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin} is not valid {}", .encoding.label())]
    Decode {
        origin: String,
        encoding: TextEncoding,
    },
    #[error("{origin} could not be parsed as {} CSV: {source}", .encoding.label())]
    Parse {
        origin: String,
        encoding: TextEncoding,
        #[source]
        source: TableError,
    },
    #[error("no text encodings configured for {origin}")]
    NoEncodings { origin: String },
}

impl LoadError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

/// A parsed table together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub encoding: TextEncoding,
    pub table: RawTable,
}

/// Reads the first existing file out of a ranked list of candidates.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    candidates: Vec<PathBuf>,
    encodings: Vec<TextEncoding>,
}

impl CsvLoader {
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            encodings: DEFAULT_ENCODINGS.to_vec(),
        }
    }

    pub fn with_encodings(mut self, encodings: &[TextEncoding]) -> Self {
        self.encodings = encodings.to_vec();
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn encodings(&self) -> &[TextEncoding] {
        &self.encodings
    }

    /// First candidate that exists as a regular file.
    pub fn resolve(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .find(|path| path.is_file())
            .map(PathBuf::as_path)
    }

    pub fn load(&self) -> Result<LoadedTable, LoadError> {
        let path = self.resolve().ok_or_else(|| self.no_data())?;
        load_path(path, &self.encodings)
    }

    fn no_data(&self) -> LoadError {
        warn!(candidates = ?self.candidates, "no case data file found");
        LoadError::NoData {
            candidates: self.candidates.clone(),
        }
    }
}

/// Reads `path`, trying each encoding until one decodes and parses.
pub fn load_path(path: &Path, encodings: &[TextEncoding]) -> Result<LoadedTable, LoadError> {
    let origin = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        origin: origin.clone(),
        source,
    })?;
    let (table, encoding) = parse_with_encodings(&bytes, encodings, &origin)?;
    info!(path = %origin, encoding = encoding.label(), rows = table.len(), "loaded case table");

    Ok(LoadedTable {
        path: path.to_path_buf(),
        encoding,
        table,
    })
}

/// Parses an uploaded stream. The first attempt reads it as UTF-8; on
/// failure the stream is rewound and read once more through `encodings`.
pub fn load_upload<R: Read + Seek>(
    mut reader: R,
    encodings: &[TextEncoding],
) -> Result<RawTable, LoadError> {
    let first = read_all(&mut reader)
        .and_then(|bytes| parse_as(&bytes, TextEncoding::Utf8Sig, UPLOAD_ORIGIN));
    match first {
        Ok(table) => return Ok(table),
        Err(error) => warn!(%error, "default upload parse failed, rewinding for one retry"),
    }

    reader.seek(SeekFrom::Start(0)).map_err(upload_io)?;
    let bytes = read_all(&mut reader)?;
    let (table, encoding) = parse_with_encodings(&bytes, encodings, UPLOAD_ORIGIN)?;
    info!(
        encoding = encoding.label(),
        rows = table.len(),
        "parsed uploaded case table on retry"
    );
    Ok(table)
}

fn read_all<R: Read>(reader: &mut R) -> Result<Vec<u8>, LoadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(upload_io)?;
    Ok(bytes)
}

fn upload_io(source: std::io::Error) -> LoadError {
    LoadError::Io {
        origin: UPLOAD_ORIGIN.to_string(),
        source,
    }
}

fn parse_with_encodings(
    bytes: &[u8],
    encodings: &[TextEncoding],
    origin: &str,
) -> Result<(RawTable, TextEncoding), LoadError> {
    let mut last_error = None;
    for &encoding in encodings {
        match parse_as(bytes, encoding, origin) {
            Ok(table) => return Ok((table, encoding)),
            Err(error) => {
                debug!(origin, encoding = encoding.label(), %error, "encoding attempt failed");
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| LoadError::NoEncodings {
        origin: origin.to_string(),
    }))
}

fn parse_as(bytes: &[u8], encoding: TextEncoding, origin: &str) -> Result<RawTable, LoadError> {
    let text = encoding.decode(bytes).ok_or_else(|| LoadError::Decode {
        origin: origin.to_string(),
        encoding,
    })?;
    RawTable::from_csv_str(&text).map_err(|source| LoadError::Parse {
        origin: origin.to_string(),
        encoding,
        source,
    })
}

/// Parsed tables keyed by canonical path. Loads are side-effect free, so
/// entries are never invalidated.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<PathBuf, Arc<LoadedTable>>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, loader: &CsvLoader) -> Result<Arc<LoadedTable>, LoadError> {
        let path = loader.resolve().ok_or_else(|| loader.no_data())?;
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if let Some(hit) = self.entries.get(&key) {
            debug!(path = %key.display(), "case table served from cache");
            return Ok(Arc::clone(hit));
        }

        let loaded = Arc::new(load_path(path, loader.encodings())?);
        self.entries.insert(key, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_each_encoding() {
        assert_eq!(
            TextEncoding::Utf8Sig.decode(b"\xEF\xBB\xBFa,b").as_deref(),
            Some("a,b")
        );
        assert_eq!(
            TextEncoding::Utf8.decode(b"\xEF\xBB\xBFa").as_deref(),
            Some("\u{feff}a")
        );
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("지역");
        assert_eq!(TextEncoding::Utf8.decode(&encoded), None);
        assert_eq!(TextEncoding::Cp949.decode(&encoded).as_deref(), Some("지역"));
    }

    #[test]
    fn empty_encoding_list_is_reported() {
        let error = parse_with_encodings(b"a\n1\n", &[], "memory").expect_err("nothing to try");
        assert!(matches!(error, LoadError::NoEncodings { .. }));
    }

    #[test]
    fn missing_candidates_signal_no_data() {
        let loader = CsvLoader::new(["./definitely-missing-a.csv", "./definitely-missing-b.csv"]);
        assert!(loader.resolve().is_none());
        let error = loader.load().expect_err("no file exists");
        assert!(error.is_no_data());
        match error {
            LoadError::NoData { candidates } => assert_eq!(candidates.len(), 2),
            other => panic!("expected no-data error, got {other:?}"),
        }
    }

    #[test]
    fn upload_parses_utf8_on_first_attempt() {
        let table =
            load_upload(Cursor::new("\u{feff}case_id\nC9\n"), &DEFAULT_ENCODINGS).expect("parse");
        assert_eq!(table.cell(0, "case_id"), Some("C9"));
    }

    #[test]
    fn upload_retries_after_rewinding() {
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("지역,담당\n서울,김\n");
        let table = load_upload(Cursor::new(encoded.into_owned()), &DEFAULT_ENCODINGS)
            .expect("retry parses");
        assert_eq!(table.cell(0, "지역"), Some("서울"));
    }

    #[test]
    fn upload_reports_last_error_when_every_attempt_fails() {
        let error = load_upload(Cursor::new("a,b\n1,2,3\n"), &DEFAULT_ENCODINGS)
            .expect_err("ragged rows");
        match error {
            LoadError::Parse { encoding, .. } => assert_eq!(encoding, TextEncoding::Cp949),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
