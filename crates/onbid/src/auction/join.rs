//! Links internal case records to auction listings by region, district and
//! the street number that follows a known road-name marker in the address.

use super::domain::MatchStatus;
use super::table::{header_key, RawTable};
use std::collections::HashMap;
use tracing::info;

/// Road-name markers, tried in order; the text after the first one found
/// must be a bare integer for the address to be joinable.
pub const ADDRESS_MARKERS: &[&str] = &["테스트로", "test-street"];

/// Prefix for listing columns whose names collide with case columns.
pub const LISTING_PREFIX: &str = "listing_";

const KEY_COLUMNS: &[&str] = &["region", "district"];
const MATCH_COLUMN: &str = "match_status";

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: RawTable,
    pub linked: usize,
    pub unlinked: usize,
}

/// Extracts the integer following the first address marker, if any.
pub fn street_number(address: &str) -> Option<i64> {
    ADDRESS_MARKERS.iter().find_map(|marker| {
        address
            .find(marker)
            .map(|position| address[position + marker.len()..].trim())
    })?
    .parse()
    .ok()
}

type JoinKey = (String, String, i64);

fn join_key(table: &RawTable, row: usize) -> Option<JoinKey> {
    let region = table.cell(row, "region")?.trim().to_string();
    let district = table.cell(row, "district")?.trim().to_string();
    let number = street_number(table.cell(row, "address")?)?;
    Some((region, district, number))
}

/// Left join of `cases` against `listings`. Every case row is kept in order;
/// the first listing with a matching key wins.
pub fn link_listings(cases: &RawTable, listings: &RawTable) -> JoinOutcome {
    let mut index: HashMap<JoinKey, usize> = HashMap::new();
    for row in 0..listings.len() {
        if let Some(key) = join_key(listings, row) {
            index.entry(key).or_insert(row);
        }
    }

    let case_columns: Vec<usize> = (0..cases.headers().len())
        .filter(|&column| header_key(&cases.headers()[column]) != MATCH_COLUMN)
        .collect();
    let listing_columns: Vec<usize> = (0..listings.headers().len())
        .filter(|&column| {
            let key = header_key(&listings.headers()[column]);
            !KEY_COLUMNS.contains(&key.as_str()) && key != MATCH_COLUMN
        })
        .collect();

    let mut headers: Vec<String> = case_columns
        .iter()
        .map(|&column| cases.headers()[column].clone())
        .collect();
    for &column in &listing_columns {
        let name = &listings.headers()[column];
        if cases.has_column(name) {
            headers.push(format!("{LISTING_PREFIX}{name}"));
        } else {
            headers.push(name.clone());
        }
    }
    headers.push(MATCH_COLUMN.to_string());

    let mut linked = 0;
    let rows: Vec<Vec<String>> = cases
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            let partner = join_key(cases, row).and_then(|key| index.get(&key).copied());
            let mut joined: Vec<String> = case_columns
                .iter()
                .map(|&column| cells[column].clone())
                .collect();
            match partner {
                Some(listing_row) => {
                    linked += 1;
                    let listing = &listings.rows()[listing_row];
                    joined.extend(listing_columns.iter().map(|&column| listing[column].clone()));
                    joined.push(MatchStatus::Linked.label().to_string());
                }
                None => {
                    joined.extend(listing_columns.iter().map(|_| String::new()));
                    joined.push(MatchStatus::Unlinked.label().to_string());
                }
            }
            joined
        })
        .collect();

    let unlinked = cases.len() - linked;
    info!(linked, unlinked, listings = listings.len(), "linked cases to auction listings");

    JoinOutcome {
        table: RawTable::new(headers, rows),
        linked,
        unlinked,
    }
}
