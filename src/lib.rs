mod cli;
mod infra;
mod report;
mod routes;
mod server;

pub use infra::AppState;
pub use routes::with_dashboard_routes;

use onbid::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
