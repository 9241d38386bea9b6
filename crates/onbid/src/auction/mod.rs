//! Load → join → normalize → derive → filter pipeline for public-auction case records.

mod book;
pub mod domain;
pub mod export;
pub mod filter;
pub mod join;
pub mod loader;
pub mod metrics;
pub mod normalizer;
mod parser;
pub mod report;
pub mod router;
pub mod service;
pub mod source;
pub mod table;

pub use book::{CaseBook, FilterOptions};
pub use domain::{CaseRecord, CaseRow, DateRange, MatchStatus, PriorityTier};
pub use filter::{sort_rows, CaseFilter, SortKey};
pub use loader::{CsvLoader, LoadCache, LoadError, LoadedTable, TextEncoding};
pub use metrics::TierBasis;
pub use router::{dashboard_router, list_view, CaseListResponse, CaseQuery};
pub use service::DashboardService;
pub use source::{CaseSource, SampleFileSource};
pub use table::{RawTable, TableError};
