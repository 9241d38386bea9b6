use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Process-level state shared with the health and metrics endpoints.
#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
