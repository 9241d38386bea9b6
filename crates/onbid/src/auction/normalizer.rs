//! Schema normalization: any parsed CSV in, a fixed [`CaseRecord`] shape out.
//!
//! Which columns exist, what they may be called in the source, and how a
//! missing value is synthesized all live in [`COLUMN_RULES`]. Nothing else in
//! the pipeline checks for column presence.

use super::domain::{CaseRecord, MatchStatus, ASSET_OTHER, UNSPECIFIED};
use super::parser::{format_number, non_blank, parse_date, parse_number};
use super::table::{header_key, RawTable};
use std::collections::HashSet;
use tracing::debug;

/// Substrings that mark a column as holding a currency amount.
pub const CURRENCY_MARKERS: &[&str] = &["amount", "금액"];

/// How a rule fills a column that is absent, or a cell that is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// `prefix` followed by the 1-based row number, zero padded to `width`.
    Sequence { prefix: &'static str, width: usize },
    Text(&'static str),
    Missing,
    /// Row-wise sum of every other currency column; unparseable cells count as zero.
    CurrencySum,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub fallback: Fallback,
}

const fn rule(
    name: &'static str,
    aliases: &'static [&'static str],
    fallback: Fallback,
) -> ColumnRule {
    ColumnRule {
        name,
        aliases,
        fallback,
    }
}

pub const COLUMN_RULES: &[ColumnRule] = &[
    rule(
        "case_id",
        &["item_id"],
        Fallback::Sequence {
            prefix: "C",
            width: 4,
        },
    ),
    rule("name_masked", &[], Fallback::Text("")),
    rule("officer", &[], Fallback::Missing),
    rule("region", &[], Fallback::Text(UNSPECIFIED)),
    rule("district", &[], Fallback::Text(UNSPECIFIED)),
    rule("stage", &[], Fallback::Text(UNSPECIFIED)),
    rule("auction_type", &[], Fallback::Text(UNSPECIFIED)),
    rule("status", &[], Fallback::Text(UNSPECIFIED)),
    rule("amount_total", &[], Fallback::CurrencySum),
    rule("amount_penalty", &[], Fallback::Missing),
    rule("asset_flag", &[], Fallback::Text(ASSET_OTHER)),
    rule("delinquent_since", &[], Fallback::Missing),
    rule("bid_start", &["start_date"], Fallback::Missing),
    rule("bid_end", &["end_date"], Fallback::Missing),
    rule("appraisal_price", &["appraised_price"], Fallback::Missing),
    rule("min_bid_price", &["min_price"], Fallback::Missing),
    rule("address", &[], Fallback::Text("")),
    rule("source_url", &[], Fallback::Text("")),
    rule("lat", &["latitude"], Fallback::Missing),
    rule("lon", &["longitude"], Fallback::Missing),
    rule("match_status", &[], Fallback::Missing),
];

/// Columns excluded from the currency sum even though their names match.
const CURRENCY_SUM_EXCLUDED: &[&str] = &["amount_total", "amount_penalty"];

pub fn expected_columns() -> impl Iterator<Item = &'static str> {
    COLUMN_RULES.iter().map(|rule| rule.name)
}

/// Returns a table whose leading columns are exactly [`COLUMN_RULES`], in
/// order, with absent columns and blank cells synthesized. Source columns no
/// rule claims are carried along after them.
pub fn ensure_columns(table: &RawTable) -> RawTable {
    let sources: Vec<Option<usize>> = COLUMN_RULES
        .iter()
        .map(|rule| source_column(table, rule))
        .collect();

    for (rule, source) in COLUMN_RULES.iter().zip(&sources) {
        if source.is_none() {
            debug!(column = rule.name, fallback = ?rule.fallback, "synthesizing absent column");
        }
    }

    let claimed: Vec<usize> = sources.iter().flatten().copied().collect();
    let extras: Vec<usize> = (0..table.headers().len())
        .filter(|index| !claimed.contains(index))
        .collect();
    let currency_columns = currency_columns(table);

    let mut headers: Vec<String> = expected_columns().map(str::to_string).collect();
    headers.extend(extras.iter().map(|&index| table.headers()[index].clone()));

    let mut taken_ids = existing_ids(table, &sources);
    let rows = table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, cells)| {
            let mut row = Vec::with_capacity(headers.len());
            for (rule, source) in COLUMN_RULES.iter().zip(&sources) {
                let existing = source.and_then(|index| non_blank(&cells[index]));
                row.push(match existing {
                    Some(value) => value.to_string(),
                    None => synthesize(
                        rule.fallback,
                        row_index,
                        cells,
                        &currency_columns,
                        &mut taken_ids,
                    ),
                });
            }
            row.extend(extras.iter().map(|&index| cells[index].clone()));
            row
        })
        .collect();

    RawTable::new(headers, rows)
}

/// Normalizes an arbitrary parsed table into typed case records.
pub fn normalize(table: &RawTable) -> Vec<CaseRecord> {
    let ensured = ensure_columns(table);
    ensured.rows().iter().map(|cells| to_record(cells)).collect()
}

fn source_column(table: &RawTable, rule: &ColumnRule) -> Option<usize> {
    table.column_index(rule.name).or_else(|| {
        rule.aliases
            .iter()
            .find_map(|alias| table.column_index(alias))
    })
}

fn currency_columns(table: &RawTable) -> Vec<usize> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            let key = header_key(header);
            CURRENCY_MARKERS.iter().any(|marker| key.contains(marker))
                && !CURRENCY_SUM_EXCLUDED.contains(&key.as_str())
        })
        .map(|(index, _)| index)
        .collect()
}

/// Non-blank values already present in sequence-filled columns.
fn existing_ids(table: &RawTable, sources: &[Option<usize>]) -> HashSet<String> {
    COLUMN_RULES
        .iter()
        .zip(sources)
        .filter(|(rule, _)| matches!(rule.fallback, Fallback::Sequence { .. }))
        .filter_map(|(_, source)| *source)
        .flat_map(|index| {
            table
                .rows()
                .iter()
                .filter_map(move |cells| non_blank(&cells[index]).map(str::to_string))
        })
        .collect()
}

/// `prefix` plus the row number, stepping past ids another row already uses.
fn next_free_id(
    prefix: &str,
    width: usize,
    row_index: usize,
    taken: &mut HashSet<String>,
) -> String {
    let mut number = row_index + 1;
    loop {
        let candidate = format!("{prefix}{number:0width$}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        number += 1;
    }
}

fn synthesize(
    fallback: Fallback,
    row_index: usize,
    cells: &[String],
    currency: &[usize],
    taken_ids: &mut HashSet<String>,
) -> String {
    match fallback {
        Fallback::Sequence { prefix, width } => next_free_id(prefix, width, row_index, taken_ids),
        Fallback::Text(value) => value.to_string(),
        Fallback::Missing => String::new(),
        Fallback::CurrencySum => {
            let total: f64 = currency
                .iter()
                .map(|&index| parse_number(&cells[index]).unwrap_or(0.0))
                .sum();
            format_number(total)
        }
    }
}

fn position(name: &str) -> usize {
    COLUMN_RULES
        .iter()
        .position(|rule| rule.name == name)
        .unwrap_or_else(|| unreachable!("no column rule named {name}"))
}

fn to_record(cells: &[String]) -> CaseRecord {
    let text = |name: &str| cells[position(name)].clone();
    let optional_text = |name: &str| non_blank(&cells[position(name)]).map(str::to_string);
    let number = |name: &str| parse_number(&cells[position(name)]);
    let date = |name: &str| parse_date(&cells[position(name)]);

    CaseRecord {
        case_id: text("case_id"),
        name_masked: text("name_masked"),
        officer: optional_text("officer"),
        region: text("region"),
        district: text("district"),
        stage: text("stage"),
        auction_type: text("auction_type"),
        status: text("status"),
        amount_total: number("amount_total").unwrap_or(0.0),
        amount_penalty: number("amount_penalty"),
        asset_flag: text("asset_flag"),
        delinquent_since: date("delinquent_since"),
        bid_start: date("bid_start"),
        bid_end: date("bid_end"),
        appraisal_price: number("appraisal_price"),
        min_bid_price: number("min_bid_price"),
        address: text("address"),
        source_url: text("source_url"),
        lat: number("lat"),
        lon: number("lon"),
        match_status: optional_text("match_status").and_then(|value| MatchStatus::parse(&value)),
    }
}
