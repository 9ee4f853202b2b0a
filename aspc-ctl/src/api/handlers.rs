//! HTTP request handlers
//!
//! Thin wrappers over `JunctionRegistry`. Malformed sensing input (negative
//! counts, unknown vehicle classes, unknown override kinds) is corrected or
//! passed through for the arbiter to ignore; only unknown junctions and
//! undecodable bodies are rejected.

use std::collections::HashMap;

use aspc_common::events::{Direction, JunctionSnapshot, OverrideKind};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::server::AppContext;
use crate::error::Error;
use crate::runtime::{JunctionInfo, PendingOverrides};
use crate::signal::pcu::{queue_estimate, weigh};
use crate::signal::{Override, OverridePayload, VehicleCounts};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
    uptime_seconds: i64,
    observed_junctions: usize,
    channel_backend: String,
    event_subscribers: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct JunctionListResponse {
    junctions: Vec<JunctionInfo>,
}

#[derive(Debug, Serialize)]
pub struct ObservationResponse {
    junction_id: String,
    observed: bool,
    /// False when the request left the junction as it already was
    changed: bool,
}

#[derive(Debug, Deserialize)]
pub struct DemandRequest {
    direction: Direction,
    /// Vehicle class label to count
    counts: HashMap<String, i64>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    kind: String,
    #[serde(default)]
    payload: OverridePayload,
    issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PcuConvertRequest {
    counts: HashMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct PcuConvertResponse {
    pcu: f64,
    queue_estimate_m: f64,
    vehicles: u64,
}

type ApiError = (StatusCode, Json<StatusResponse>);

/// Map a registry error onto an HTTP status
fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::JunctionNotFound(_) | Error::NotObserved(_) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => {
            error!("Request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let uptime = aspc_common::time::age_seconds(ctx.started_at, aspc_common::time::now());
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "aspc-ctl".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        uptime_seconds: uptime.max(0),
        observed_junctions: ctx.registry.observed_junctions().await.len(),
        channel_backend: ctx.registry.channel().backend_name().to_string(),
        event_subscribers: ctx.event_bus.subscriber_count(),
    })
}

// ============================================================================
// Junction Observation
// ============================================================================

/// GET /junctions - configured junctions and whether each is observed
pub async fn list_junctions(State(ctx): State<AppContext>) -> Json<JunctionListResponse> {
    Json(JunctionListResponse {
        junctions: ctx.registry.list().await,
    })
}

/// GET /junctions/:id/state - latest snapshot
pub async fn get_state(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<JunctionSnapshot>, ApiError> {
    ctx.registry
        .get_current_state(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /junctions/:id/observe - start a controller (cold start)
pub async fn start_observation(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ObservationResponse>, ApiError> {
    let changed = ctx
        .registry
        .start_observation(&id)
        .await
        .map_err(error_response)?;
    Ok(Json(ObservationResponse {
        junction_id: id,
        observed: true,
        changed,
    }))
}

/// DELETE /junctions/:id/observe - stop the controller and drop its state
pub async fn stop_observation(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ObservationResponse>, ApiError> {
    let changed = ctx
        .registry
        .stop_observation(&id)
        .await
        .map_err(error_response)?;
    Ok(Json(ObservationResponse {
        junction_id: id,
        observed: false,
        changed,
    }))
}

// ============================================================================
// Demand
// ============================================================================

/// POST /junctions/:id/demand - fresh vehicle counts for one approach
pub async fn update_demand(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<DemandRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let counts = VehicleCounts::from_labels(req.counts);
    ctx.registry
        .update_approach_demand(&id, req.direction, counts)
        .await
        .map_err(error_response)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: "accepted".to_string(),
        }),
    ))
}

// ============================================================================
// Overrides
// ============================================================================

/// POST /junctions/:id/overrides - submit an override command
pub async fn submit_override(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<OverrideRequest>,
) -> Result<(StatusCode, Json<Override>), ApiError> {
    if req.kind.trim().is_empty() {
        return Err(error_response(Error::BadRequest(
            "override kind must not be empty".to_string(),
        )));
    }
    let kind = req.kind.parse::<OverrideKind>().unwrap_or(OverrideKind::Unknown);
    let mut payload = req.payload;
    if kind == OverrideKind::EmergencyCorridor && payload.vehicle_id.is_none() {
        payload.vehicle_id = Some("unknown".to_string());
    }

    info!("Override request for {}: {}", id, req.kind);
    let command = ctx
        .registry
        .submit_override(&id, kind, payload, req.issued_at)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::ACCEPTED, Json(command)))
}

/// GET /junctions/:id/overrides - pending commands and the current winner
pub async fn list_overrides(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<PendingOverrides>, ApiError> {
    ctx.registry
        .pending_overrides(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

// ============================================================================
// Utilities
// ============================================================================

/// POST /pcu/convert - weigh a vehicle mix with the configured factors
pub async fn convert_pcu(
    State(ctx): State<AppContext>,
    Json(req): Json<PcuConvertRequest>,
) -> Json<PcuConvertResponse> {
    let tuning = ctx.registry.tuning();
    let counts = VehicleCounts::from_labels(req.counts);
    let pcu = weigh(&counts, &tuning.pcu_weights);
    Json(PcuConvertResponse {
        pcu,
        queue_estimate_m: queue_estimate(pcu, tuning.queue_meters_per_pcu),
        vehicles: counts.total_vehicles(),
    })
}
