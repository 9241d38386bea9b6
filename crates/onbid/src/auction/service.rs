use super::book::CaseBook;
use super::domain::DateRange;
use super::join::link_listings;
use super::loader::{
    load_upload, CsvLoader, LoadCache, LoadError, LoadedTable, DEFAULT_ENCODINGS,
};
use super::source::{CaseSource, SampleFileSource};
use super::table::RawTable;
use crate::config::DashboardConfig;
use chrono::NaiveDate;
use std::borrow::Cow;
use std::io::{Read, Seek};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Runs load, join, normalize and derive for every request. The parsed
/// tables are cached; the derived book is rebuilt per evaluation date.
pub struct DashboardService {
    config: DashboardConfig,
    cases: CsvLoader,
    listings: Option<CsvLoader>,
    cache: Mutex<LoadCache>,
    source: Box<dyn CaseSource>,
}

impl DashboardService {
    pub fn new(config: DashboardConfig) -> Self {
        let source = Box::new(SampleFileSource::new(config.sample_path.clone()));
        Self::with_source(config, source)
    }

    pub fn with_source(config: DashboardConfig, source: Box<dyn CaseSource>) -> Self {
        let cases = CsvLoader::new(config.data_paths.clone());
        let listings = config
            .listings_path
            .as_ref()
            .map(|path| CsvLoader::new([path.clone()]));

        Self {
            config,
            cases,
            listings,
            cache: Mutex::new(LoadCache::new()),
            source,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Cases from the first existing configured data file.
    pub fn book(&self, today: NaiveDate) -> Result<CaseBook, LoadError> {
        let loaded = self.cache().load(&self.cases)?;
        self.assemble(&loaded.table, today)
    }

    /// Cases from an uploaded CSV, bypassing the data files.
    pub fn upload<R: Read + Seek>(
        &self,
        reader: R,
        today: NaiveDate,
    ) -> Result<CaseBook, LoadError> {
        let table = load_upload(reader, &DEFAULT_ENCODINGS)?;
        info!(rows = table.len(), "accepted uploaded case table");
        self.assemble(&table, today)
    }

    /// Listings from the upstream source, scored like internal cases.
    pub fn fetch_upstream(
        &self,
        range: Option<DateRange>,
        today: NaiveDate,
    ) -> Result<CaseBook, LoadError> {
        let table = self.source.fetch(&self.config.api_token, range)?;
        Ok(CaseBook::from_table(&table, today, self.config.tier_basis))
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    fn assemble(&self, cases: &RawTable, today: NaiveDate) -> Result<CaseBook, LoadError> {
        let listings = self.listings_table()?;
        let table = match &listings {
            Some(loaded) => Cow::Owned(link_listings(cases, &loaded.table).table),
            None => Cow::Borrowed(cases),
        };
        Ok(CaseBook::from_table(&table, today, self.config.tier_basis))
    }

    fn listings_table(&self) -> Result<Option<Arc<LoadedTable>>, LoadError> {
        let Some(loader) = &self.listings else {
            return Ok(None);
        };

        match self.cache().load(loader) {
            Ok(loaded) => Ok(Some(loaded)),
            Err(LoadError::NoData { candidates }) => {
                warn!(?candidates, "listings file missing, serving cases unlinked");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn cache(&self) -> MutexGuard<'_, LoadCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
