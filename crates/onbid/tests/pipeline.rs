use chrono::NaiveDate;
use onbid::auction::export::{to_csv_bytes, EXPORT_COLUMNS};
use onbid::auction::loader::{load_upload, DEFAULT_ENCODINGS};
use onbid::auction::report::summarize;
use onbid::auction::{
    CaseBook, CaseFilter, DashboardService, MatchStatus, PriorityTier, RawTable, TierBasis,
};
use onbid::config::DashboardConfig;
use std::io::Cursor;
use std::path::PathBuf;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid evaluation date")
}

fn data_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .join(name)
}

#[test]
fn three_row_export_without_totals_is_scored_end_to_end() {
    let csv = "case_id,officer,stage,asset_flag,tax_amount,fee_amount,appraisal_price,min_bid_price,bid_end\n\
A1,Kim Jumu,압류,부동산,1000,100,200,140,2025-06-04\n\
A2,Lee Seo,분납중,예금,3000,0,0,500,2025-06-20\n\
A3,,체납,,500,50,,,\n";
    let table = RawTable::from_csv_str(csv).expect("fixture parses");
    let book = CaseBook::from_table(&table, today(), TierBasis::PriorityScore);
    let rows = book.rows();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].record.amount_total, 1100.0);
    assert_eq!(rows[1].record.amount_total, 3000.0);
    assert_eq!(rows[2].record.amount_total, 550.0);

    assert_eq!(rows[0].min_ratio, Some(0.7));
    assert_eq!(rows[1].min_ratio, None, "zero appraisal price");
    assert_eq!(rows[2].min_ratio, None);

    assert_eq!(rows[0].due_days, Some(3));
    assert_eq!(rows[2].due_days, None);
    assert_eq!(rows[2].record.region, "미지정");
    assert_eq!(rows[2].record.asset_flag, "기타");

    let tiers: Vec<PriorityTier> = rows.iter().map(|row| row.priority_tier).collect();
    assert_eq!(tiers, vec![PriorityTier::B, PriorityTier::A, PriorityTier::C]);

    let kim = CaseFilter {
        officer: Some("kim".into()),
        ..CaseFilter::default()
    };
    let view = book.filter(&kim);
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].record.case_id, "A1");
}

#[test]
fn exported_view_reparses_to_the_same_cells() {
    let service = DashboardService::new(DashboardConfig {
        data_paths: vec![data_file("cases.csv")],
        ..DashboardConfig::default()
    });
    let book = service.book(today()).expect("bundled cases load");
    let filter = CaseFilter {
        region: Some("서울".into()),
        ..CaseFilter::default()
    };
    let view = book.filter(&filter);
    assert!(!view.is_empty());

    let bytes = to_csv_bytes(&view).expect("export succeeds");
    let reparsed = load_upload(Cursor::new(bytes), &DEFAULT_ENCODINGS).expect("export parses");

    assert_eq!(reparsed.headers(), EXPORT_COLUMNS);
    assert_eq!(reparsed.len(), view.len());
    for (index, row) in view.iter().enumerate() {
        for column in EXPORT_COLUMNS {
            assert_eq!(
                reparsed.cell(index, column).map(str::to_string),
                row.column_value(column),
                "row {index} column {column}"
            );
        }
    }
}

#[test]
fn bundled_cases_link_to_bundled_listings() {
    let service = DashboardService::new(DashboardConfig {
        data_paths: vec![data_file("missing.csv"), data_file("cases.csv")],
        listings_path: Some(data_file("sample_onbid.csv")),
        ..DashboardConfig::default()
    });
    let book = service.book(today()).expect("bundled cases load");
    assert_eq!(book.len(), 8);

    let linked: Vec<&str> = book
        .rows()
        .iter()
        .filter(|row| row.record.match_status == Some(MatchStatus::Linked))
        .map(|row| row.record.case_id.as_str())
        .collect();
    assert_eq!(linked, vec!["C0001", "C0003", "C0004"]);
    assert!(book
        .rows()
        .iter()
        .all(|row| row.record.match_status.is_some()));

    let first = &book.rows()[0].record;
    assert_eq!(first.amount_total, 13_750_000.0);
    assert_eq!(first.amount_penalty, Some(850_000.0));

    let summary = summarize(&book.filter(&CaseFilter::default()));
    assert_eq!(summary.kpis.linked, 3);
    assert_eq!(summary.kpis.count, 8);
    assert_eq!(summary.top_regions[0].label, "서울");
}

#[test]
fn upstream_sample_maps_listing_columns() {
    let service = DashboardService::new(DashboardConfig {
        data_paths: vec![data_file("missing.csv")],
        sample_path: data_file("sample_onbid.csv"),
        ..DashboardConfig::default()
    });
    assert!(service.book(today()).expect_err("no cases file").is_no_data());

    let book = service.fetch_upstream(None, today()).expect("sample listings load");
    assert_eq!(book.len(), 6);
    let first = &book.rows()[0];
    assert_eq!(first.record.case_id, "OB-2025-0101");
    assert_eq!(first.record.bid_start, NaiveDate::from_ymd_opt(2025, 6, 2));
    assert_eq!(first.min_ratio, Some(0.7));
    assert_eq!(first.record.lat, Some(37.4979));
}
