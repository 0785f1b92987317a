//! Dashboard route handler.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use supernova_core::metrics::DashboardStats;
use supernova_core::{ChartBucket, Metric};
use tracing::instrument;

use crate::middleware::RequireSuperAdmin;
use crate::services::SyncStatus;
use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}

/// Everything the overview page renders.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub operator: String,
    pub stats: DashboardStats,
    pub metrics: Vec<Metric>,
    pub chart: Vec<ChartBucket>,
    pub sync: SyncStatus,
}

/// Dashboard overview handler.
///
/// Serves the memoized snapshot of the cached collection; it never fetches.
#[instrument(skip(session, state))]
async fn dashboard(
    RequireSuperAdmin(session): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Json<DashboardResponse> {
    let users = state.sync().users().await;
    let snapshot = state.metrics().snapshot(&users);

    Json(DashboardResponse {
        operator: session.user.name,
        stats: snapshot.stats,
        metrics: snapshot.metrics.clone(),
        chart: snapshot.chart.clone(),
        sync: state.sync().status().await,
    })
}
