use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::book::{CaseBook, FilterOptions};
use super::domain::{CaseRow, DateRange, PriorityTier};
use super::export::to_csv_bytes;
use super::filter::{sort_rows, CaseFilter, SortKey};
use super::parser::parse_date;
use super::report::{kpis, summarize, DashboardSummary, KpiSummary};
use super::service::DashboardService;
use crate::error::AppError;

/// Router exposing the case table, its summary, downloads and uploads.
pub fn dashboard_router(service: Arc<DashboardService>) -> Router {
    let upload_limit = DefaultBodyLimit::max(service.config().upload_limit_bytes);
    Router::new()
        .route("/api/v1/cases", get(list_handler))
        .route("/api/v1/cases/summary", get(summary_handler))
        .route("/api/v1/cases/export", get(export_handler))
        .route("/api/v1/cases/options", get(options_handler))
        .route(
            "/api/v1/cases/upload",
            post(upload_handler).layer(upload_limit),
        )
        .route("/api/v1/sources/onbid", get(source_handler))
        .with_state(service)
}

/// Query string shared by every case endpoint. List-valued parameters are
/// comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct CaseQuery {
    pub region: Option<String>,
    pub auction_type: Option<String>,
    pub status: Option<String>,
    pub officer: Option<String>,
    pub stages: Option<String>,
    pub tiers: Option<String>,
    pub max_due_days: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub today: Option<NaiveDate>,
    pub sort: Option<String>,
    pub descending: Option<bool>,
    pub limit: Option<usize>,
}

impl CaseQuery {
    pub fn filter(&self) -> Result<CaseFilter, AppError> {
        let tiers = split_list(self.tiers.as_deref())
            .map(|tier| tier.parse::<PriorityTier>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| AppError::InvalidQuery(err.to_string()))?;

        Ok(CaseFilter {
            region: self.region.clone(),
            auction_type: self.auction_type.clone(),
            status: self.status.clone(),
            officer: self.officer.clone(),
            stages: split_list(self.stages.as_deref())
                .map(str::to_string)
                .collect(),
            tiers,
            max_due_days: self.max_due_days,
            date_range: self.date_range(),
        })
    }

    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::new(self.from, self.to)
    }

    pub fn sort_key(&self) -> Result<SortKey, AppError> {
        let sort = self.sort.as_deref().map(str::trim);
        match sort.filter(|sort| !sort.is_empty()) {
            Some(sort) => sort.parse().map_err(AppError::InvalidQuery),
            None => Ok(SortKey::default()),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("failed to parse '{value}' as a date"))
        }),
    }
}

#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub today: NaiveDate,
    pub total: usize,
    pub kpis: KpiSummary,
    pub rows: Vec<CaseRow>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub today: NaiveDate,
    #[serde(flatten)]
    pub summary: DashboardSummary,
}

#[derive(Debug, Serialize)]
pub struct SourceResponse {
    pub source: String,
    #[serde(flatten)]
    pub cases: CaseListResponse,
}

/// Filters, sorts and truncates `book` per `query`. KPIs cover the whole
/// filtered view; `limit` only trims the returned rows.
pub fn list_view(book: &CaseBook, query: &CaseQuery) -> Result<CaseListResponse, AppError> {
    let filter = query.filter()?;
    let mut view = book.filter(&filter);
    sort_rows(&mut view, query.sort_key()?, query.descending.unwrap_or(true));

    let kpis = kpis(&view);
    let total = view.len();
    let limit = query.limit.unwrap_or(total);

    Ok(CaseListResponse {
        today: book.today(),
        total,
        kpis,
        rows: view.into_iter().take(limit).cloned().collect(),
    })
}

async fn list_handler(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<CaseListResponse>, AppError> {
    let book = service.book(query.today())?;
    Ok(Json(list_view(&book, &query)?))
}

async fn summary_handler(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let book = service.book(query.today())?;
    let view = book.filter(&query.filter()?);
    Ok(Json(SummaryResponse {
        today: book.today(),
        summary: summarize(&view),
    }))
}

async fn export_handler(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<CaseQuery>,
) -> Result<Response, AppError> {
    let book = service.book(query.today())?;
    let mut view = book.filter(&query.filter()?);
    sort_rows(&mut view, query.sort_key()?, query.descending.unwrap_or(true));
    let body = to_csv_bytes(&view)?;

    let disposition = format!(
        "attachment; filename=\"onbid_cases_{}.csv\"",
        book.today().format("%Y%m%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn options_handler(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<FilterOptions>, AppError> {
    let book = service.book(query.today())?;
    Ok(Json(book.options()))
}

async fn upload_handler(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<CaseQuery>,
    body: Bytes,
) -> Result<Json<CaseListResponse>, AppError> {
    let book = service.upload(Cursor::new(body), query.today())?;
    Ok(Json(list_view(&book, &query)?))
}

async fn source_handler(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<SourceResponse>, AppError> {
    let book = service.fetch_upstream(query.date_range(), query.today())?;
    Ok(Json(SourceResponse {
        source: service.source_name().to_string(),
        cases: list_view(&book, &query)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn service_without_data() -> Arc<DashboardService> {
        Arc::new(DashboardService::new(DashboardConfig {
            data_paths: vec!["./no-cases-here.csv".into()],
            ..DashboardConfig::default()
        }))
    }

    #[test]
    fn comma_lists_and_sort_keys_parse() {
        let query = CaseQuery {
            stages: Some("압류, 분납중,".into()),
            tiers: Some("a,C".into()),
            sort: Some("amount".into()),
            ..CaseQuery::default()
        };
        let filter = query.filter().expect("valid query");
        assert_eq!(filter.stages, vec!["압류", "분납중"]);
        assert_eq!(filter.tiers, vec![PriorityTier::A, PriorityTier::C]);
        assert_eq!(query.sort_key().expect("known key"), SortKey::AmountTotal);
    }

    #[test]
    fn bad_tiers_and_sort_keys_are_rejected() {
        let query = CaseQuery {
            tiers: Some("A,Z".into()),
            sort: Some("rank".into()),
            ..CaseQuery::default()
        };
        assert!(matches!(query.filter(), Err(AppError::InvalidQuery(_))));
        assert!(matches!(query.sort_key(), Err(AppError::InvalidQuery(_))));
    }

    #[test]
    fn list_view_limits_rows_but_not_kpis() {
        let table = crate::auction::RawTable::from_csv_str(
            "case_id,amount_total,bid_start\nC1,10,2025-01-01\nC2,20,2025-02-01\nC3,30,\n",
        )
        .expect("fixture parses");
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
        let book = CaseBook::from_table(&table, today, Default::default());
        let query = CaseQuery {
            limit: Some(2),
            ..CaseQuery::default()
        };

        let response = list_view(&book, &query).expect("view builds");
        assert_eq!(response.total, 3);
        assert_eq!(response.kpis.amount_total, 60.0);
        let ids: Vec<&str> = response
            .rows
            .iter()
            .map(|row| row.record.case_id.as_str())
            .collect();
        assert_eq!(ids, vec!["C2", "C1"]);
    }

    #[tokio::test]
    async fn list_handler_surfaces_missing_data() {
        let result = list_handler(State(service_without_data()), Query(CaseQuery::default())).await;
        match result {
            Err(error @ AppError::Load(_)) => assert_eq!(error.status(), StatusCode::NOT_FOUND),
            other => panic!("expected a load error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn upload_route_sorts_uploaded_rows() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/cases/upload?today=2025-06-01&sort=due_days&descending=false")
            .body(Body::from("case_id,bid_end\nX1,2025-06-09\nX2,2025-06-03\n"))
            .expect("request builds");
        let response = dashboard_router(service_without_data())
            .oneshot(request)
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body collects");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["rows"][0]["case_id"], "X2");
        assert_eq!(payload["rows"][0]["due_days"], 2);
    }

    fn large_upload(rows: usize) -> String {
        let memo = "x".repeat(200);
        let mut csv = String::from("case_id,region,memo\n");
        for index in 0..rows {
            csv.push_str(&format!("U{index},서울,{memo}\n"));
        }
        csv
    }

    async fn upload_status(service: Arc<DashboardService>, body: String) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/cases/upload?today=2025-06-01&limit=1")
            .body(Body::from(body))
            .expect("request builds");
        dashboard_router(service)
            .oneshot(request)
            .await
            .expect("router responds")
            .status()
    }

    #[tokio::test]
    async fn uploads_beyond_two_megabytes_are_accepted() {
        let body = large_upload(16_000);
        assert!(body.len() > 3 * 1024 * 1024);
        assert_eq!(upload_status(service_without_data(), body).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn uploads_over_the_configured_limit_are_refused() {
        let service = Arc::new(DashboardService::new(DashboardConfig {
            data_paths: vec!["./no-cases-here.csv".into()],
            upload_limit_bytes: 1024,
            ..DashboardConfig::default()
        }));
        let status = upload_status(service, large_upload(10)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn bad_dates_are_rejected_by_the_extractor() {
        let request = Request::builder()
            .uri("/api/v1/cases?today=tomorrow")
            .body(Body::empty())
            .expect("request builds");
        let response = dashboard_router(service_without_data())
            .oneshot(request)
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
