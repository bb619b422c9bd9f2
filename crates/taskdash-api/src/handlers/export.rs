//! Control surface for one exporter instance. The same handler set is
//! mounted once per destination; the router's state carries the exporter it
//! drives.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use taskdash_export::{ArtifactFormat, Exporter, OpOutcome};
use taskdash_store::StoredObject;

/// Read-only exporter status
pub async fn get_status(State(exporter): State<Exporter>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "status": exporter.status(),
    }))
}

fn outcome_response(outcome: OpOutcome) -> (StatusCode, Json<OpOutcome>) {
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome))
}

/// Run one export cycle now
pub async fn manual_export(
    State(exporter): State<Exporter>,
) -> (StatusCode, Json<OpOutcome>) {
    outcome_response(exporter.trigger_manual().await)
}

/// Start the recurring export
pub async fn start_auto_export(
    State(exporter): State<Exporter>,
) -> (StatusCode, Json<OpOutcome>) {
    outcome_response(exporter.start().await)
}

/// Stop the recurring export
pub async fn stop_auto_export(
    State(exporter): State<Exporter>,
) -> (StatusCode, Json<OpOutcome>) {
    outcome_response(exporter.stop().await)
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub interval_minutes: Option<i64>,
}

/// Update the export interval; the running loop restarts so the new period
/// takes effect on the next wake.
pub async fn update_config(
    State(exporter): State<Exporter>,
    Json(payload): Json<UpdateConfigRequest>,
) -> (StatusCode, Json<OpOutcome>) {
    if let Some(minutes) = payload.interval_minutes {
        if let Err(e) = exporter.set_interval(minutes).await {
            return outcome_response(OpOutcome::fail(e.to_string()));
        }
    }

    outcome_response(OpOutcome::ok("Configuration updated"))
}

/// Probe the destination
pub async fn test_connection(
    State(exporter): State<Exporter>,
) -> (StatusCode, Json<OpOutcome>) {
    outcome_response(exporter.test_connection().await)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub files: Vec<StoredObject>,
}

/// Most recent uploads at the destination
pub async fn list_exports(
    State(exporter): State<Exporter>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, (StatusCode, Json<OpOutcome>)> {
    match exporter.list_recent(query.limit.unwrap_or(10)).await {
        Ok(files) => Ok(Json(ListResponse {
            success: true,
            files,
        })),
        Err(e) => Err(outcome_response(OpOutcome::fail(e.to_string()))),
    }
}

#[derive(Debug, Serialize)]
pub struct FormatResponse {
    pub success: bool,
    pub content: String,
    pub filename: String,
}

/// Render one artifact inline (csv, json or report)
pub async fn export_format(
    State(exporter): State<Exporter>,
    Path(format): Path<String>,
) -> Result<Json<FormatResponse>, (StatusCode, Json<OpOutcome>)> {
    let format = ArtifactFormat::from_str(&format)
        .map_err(|e| outcome_response(OpOutcome::fail(e.to_string())))?;

    match exporter.render(format).await {
        Ok(rendered) => Ok(Json(FormatResponse {
            success: true,
            content: rendered.content,
            filename: rendered.filename,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OpOutcome::fail(format!("Failed to render export: {}", e))),
        )),
    }
}
