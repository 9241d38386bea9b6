use super::domain::DateRange;
use super::loader::{load_path, LoadError, DEFAULT_ENCODINGS};
use super::table::RawTable;
use std::path::{Path, PathBuf};
use tracing::info;

/// Token the bundled sample source is configured with when none is set.
pub const SAMPLE_TOKEN: &str = "SAMPLE_TOKEN";

/// Upstream provider of auction listings.
pub trait CaseSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, token: &str, range: Option<DateRange>) -> Result<RawTable, LoadError>;
}

/// Stands in for the public-auction listing API by reading a canned export.
/// The token and date range are accepted and ignored.
#[derive(Debug, Clone)]
pub struct SampleFileSource {
    path: PathBuf,
}

impl SampleFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaseSource for SampleFileSource {
    fn name(&self) -> &str {
        "onbid-sample"
    }

    fn fetch(&self, _token: &str, range: Option<DateRange>) -> Result<RawTable, LoadError> {
        if !self.path.is_file() {
            return Err(LoadError::NoData {
                candidates: vec![self.path.clone()],
            });
        }
        let loaded = load_path(&self.path, &DEFAULT_ENCODINGS)?;
        info!(source = self.name(), ?range, rows = loaded.table.len(), "fetched upstream listings");
        Ok(loaded.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sample_is_reported_as_no_data() {
        let source = SampleFileSource::new("./no-such-sample.csv");
        let error = source.fetch(SAMPLE_TOKEN, None).expect_err("file is missing");
        assert!(error.is_no_data());
    }
}
