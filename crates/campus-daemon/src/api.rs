//! REST API handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use campus_core::{CommandReply, HostCommand};
use campus_scene::{PointerEvent, Viewport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Buildings with their floor states
pub async fn list_buildings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let buildings = state.viewer.lock().await.store().buildings().await;
    Json(buildings)
}

/// Every marker created so far
pub async fn list_pins(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let markers = state.viewer.lock().await.pins().markers().to_vec();
    Json(markers)
}

pub async fn get_camera(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pose = state.viewer.lock().await.camera().pose();
    Json(pose)
}

/// Run a host command, body `{ "type": "ufcim.*", "payload": {...} }`
pub async fn post_command(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let command = match HostCommand::parse(&body) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "Rejected host command");
            return (StatusCode::BAD_REQUEST, Json(ApiError::new(e.to_string()))).into_response();
        }
    };

    let kind = command.kind();
    let ok = state.viewer.lock().await.dispatch(command).await;
    info!(command = kind, ok, "Host command handled");
    Json(CommandReply {
        command: kind.to_string(),
        ok,
    })
    .into_response()
}

#[derive(Deserialize)]
pub struct PointerRequest {
    #[serde(flatten)]
    pointer: PointerEvent,
    viewport: Viewport,
}

#[derive(Serialize)]
struct PointerResponse {
    pin_id: Option<String>,
}

/// Pointer press on the canvas
pub async fn post_pointer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PointerRequest>,
) -> impl IntoResponse {
    let pin_id = state
        .viewer
        .lock()
        .await
        .pointer_down(req.pointer, req.viewport)
        .await;
    Json(PointerResponse { pin_id })
}

#[derive(Deserialize)]
pub struct FloorRequest {
    /// Defaults to the focused building
    #[serde(default)]
    building: Option<String>,
    level: i32,
}

/// Show floors up to a level
pub async fn post_floors(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FloorRequest>,
) -> impl IntoResponse {
    let mut viewer = state.viewer.lock().await;
    let ok = match &req.building {
        Some(building) => viewer.set_floor_level(building, req.level).await,
        None => viewer.set_floor_level_for_focused(req.level).await,
    };

    if ok {
        let buildings = viewer.store().buildings().await;
        Json(buildings).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Building not found")),
        )
            .into_response()
    }
}

/// Show every floor of every building
pub async fn post_show_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut viewer = state.viewer.lock().await;
    viewer.show_all_blocks().await;
    let buildings = viewer.store().buildings().await;
    Json(buildings)
}

#[derive(Deserialize)]
pub struct CloseRequest {
    #[serde(default = "default_restore")]
    restore_camera: bool,
}

fn default_restore() -> bool {
    true
}

pub async fn post_close_popup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseRequest>,
) -> impl IntoResponse {
    let closed = state.viewer.lock().await.close_popup(req.restore_camera);
    if closed {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
