//! REST API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stepview_core::{AxisEntry, FrustumEntry, MeshData, MeshEntry, PointCloudEntry};
use tracing::{debug, info};

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

/// Acknowledgement for pushes that touch the step history
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StepAck {
    pub step: u32,
    pub total_steps: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusAck {
    pub status: String,
}

impl StatusAck {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SceneQuery {
    step: Option<u32>,
}

/// Scene snapshot for the latest step or `?step=N`
pub async fn get_scene(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SceneQuery>,
) -> impl IntoResponse {
    match state.read().await.snapshot(query.step) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            debug!(step = ?query.step, "Requested step out of range");
            (StatusCode::NOT_FOUND, Json(ApiError::new(e.to_string()))).into_response()
        }
    }
}

/// Step history metadata
pub async fn list_steps(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.read().await.step_info())
}

/// Initial scene content
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoadSceneRequest {
    #[serde(default)]
    pub points: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    pub mesh: Option<MeshData>,
}

pub async fn load_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadSceneRequest>,
) -> impl IntoResponse {
    state.write().await.load_scene(req.points, req.mesh);
    StatusAck::ok()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMeshRequest {
    pub mesh: MeshData,
    #[serde(default)]
    pub label: Option<String>,
}

pub async fn update_mesh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateMeshRequest>,
) -> impl IntoResponse {
    let mut store = state.write().await;
    let step = store.update_mesh(req.mesh, req.label);
    info!(step, "Mesh updated");
    Json(StepAck {
        step,
        total_steps: store.total_steps(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePointCloudRequest {
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub label: Option<String>,
}

pub async fn update_point_cloud(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePointCloudRequest>,
) -> impl IntoResponse {
    let mut store = state.write().await;
    let step = store.update_point_cloud(req.points, req.label);
    info!(step, "Point cloud updated");
    Json(StepAck {
        step,
        total_steps: store.total_steps(),
    })
}

pub async fn add_mesh(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<MeshEntry>,
) -> impl IntoResponse {
    let mut store = state.write().await;
    let step = store.add_mesh(entry);
    Json(StepAck {
        step,
        total_steps: store.total_steps(),
    })
}

pub async fn add_point_cloud(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<PointCloudEntry>,
) -> impl IntoResponse {
    let mut store = state.write().await;
    let step = store.add_point_cloud(entry);
    Json(StepAck {
        step,
        total_steps: store.total_steps(),
    })
}

pub async fn add_frustum(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<FrustumEntry>,
) -> impl IntoResponse {
    state.write().await.add_frustum(entry);
    StatusAck::ok()
}

pub async fn add_object_axis(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<AxisEntry>,
) -> impl IntoResponse {
    state.write().await.add_object_axis(entry);
    StatusAck::ok()
}

pub async fn add_global_axes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.write().await.set_global_axes();
    StatusAck::ok()
}

pub async fn clear_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.write().await.clear();
    StatusAck::ok()
}

pub async fn health() -> impl IntoResponse {
    Json(StatusAck {
        status: "healthy".to_string(),
    })
}
