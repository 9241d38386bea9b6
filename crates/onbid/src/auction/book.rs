use super::domain::CaseRow;
use super::filter::{CaseFilter, ALL};
use super::metrics::{derive_rows, TierBasis};
use super::normalizer::normalize;
use super::table::RawTable;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// The normalized, derived record set for one evaluation date. Rows are
/// never mutated after construction; filtering returns borrowed views.
#[derive(Debug, Clone)]
pub struct CaseBook {
    rows: Vec<CaseRow>,
    today: NaiveDate,
    basis: TierBasis,
}

/// Selector choices for the filter sidebar, each list led by [`ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub auction_types: Vec<String>,
    pub statuses: Vec<String>,
    pub stages: Vec<String>,
    pub earliest_bid_start: Option<NaiveDate>,
    pub latest_bid_end: Option<NaiveDate>,
}

impl CaseBook {
    pub fn from_table(table: &RawTable, today: NaiveDate, basis: TierBasis) -> Self {
        let rows = derive_rows(normalize(table), today, basis);
        Self { rows, today, basis }
    }

    pub fn rows(&self) -> &[CaseRow] {
        &self.rows
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn basis(&self) -> TierBasis {
        self.basis
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filter(&self, filter: &CaseFilter) -> Vec<&CaseRow> {
        filter.apply(&self.rows)
    }

    pub fn options(&self) -> FilterOptions {
        let stages: BTreeSet<&str> = self
            .rows
            .iter()
            .map(|row| row.record.stage.as_str())
            .collect();

        FilterOptions {
            regions: choices(self.rows.iter().map(|row| row.record.region.as_str())),
            auction_types: choices(self.rows.iter().map(|row| row.record.auction_type.as_str())),
            statuses: choices(self.rows.iter().map(|row| row.record.status.as_str())),
            stages: stages.into_iter().map(str::to_string).collect(),
            earliest_bid_start: self.rows.iter().filter_map(|row| row.record.bid_start).min(),
            latest_bid_end: self.rows.iter().filter_map(|row| row.record.bid_end).max(),
        }
    }
}

fn choices<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let distinct: BTreeSet<&str> = values.collect();
    std::iter::once(ALL.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_list_distinct_values_after_the_all_choice() {
        let table = RawTable::from_csv_str(
            "region,stage,bid_start,bid_end\n부산,압류,2025-03-01,2025-03-09\n서울,체납,,2025-04-01\n부산,압류,2025-02-01,\n",
        )
        .expect("fixture parses");
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
        let book = CaseBook::from_table(&table, today, TierBasis::default());
        let options = book.options();

        assert_eq!(options.regions, vec![ALL, "부산", "서울"]);
        assert_eq!(options.auction_types, vec![ALL, "미지정"]);
        assert_eq!(options.stages, vec!["압류", "체납"]);
        assert_eq!(options.earliest_bid_start, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(options.latest_bid_end, NaiveDate::from_ymd_opt(2025, 4, 1));
    }
}
