use super::engine::Command;
use super::types::CommandStatistics;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

pub async fn handle_status(
    Extension(command): Extension<Arc<Command>>,
) -> (StatusCode, Json<CommandStatistics>) {
    let statistics = command.statistics();

    tracing::debug!(
        "Status query: '{}' is {} with {} pending request(s)",
        statistics.name,
        statistics.master_job.state,
        statistics.pending_outgoing
    );

    (StatusCode::OK, Json(statistics))
}

pub async fn handle_commands(
    Extension(command): Extension<Arc<Command>>,
) -> (StatusCode, Json<Vec<String>>) {
    let keys = command
        .supported_keys()
        .iter()
        .map(|key| key.to_string())
        .collect();

    (StatusCode::OK, Json(keys))
}
