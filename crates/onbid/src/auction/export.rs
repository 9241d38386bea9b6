use super::domain::CaseRow;
use std::io::Write;

/// Columns of the results table, in display and download order.
pub const EXPORT_COLUMNS: &[&str] = &[
    "case_id",
    "name_masked",
    "officer",
    "region",
    "district",
    "stage",
    "auction_type",
    "status",
    "amount_total",
    "asset_flag",
    "bid_start",
    "bid_end",
    "appraisal_price",
    "min_bid_price",
    "min_ratio",
    "days_delinquent",
    "due_days",
    "priority_score",
    "priority_tier",
    "match_status",
    "address",
    "source_url",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write CSV export: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes `rows` as BOM-prefixed UTF-8 CSV with a header line.
pub fn write_csv<W: Write>(mut writer: W, rows: &[&CaseRow]) -> Result<(), ExportError> {
    writer.write_all(UTF8_BOM)?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_COLUMNS)?;
    for row in rows {
        let cells = EXPORT_COLUMNS
            .iter()
            .map(|column| row.column_value(column).unwrap_or_default());
        csv_writer.write_record(cells)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(rows: &[&CaseRow]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, rows)?;
    Ok(buffer)
}
