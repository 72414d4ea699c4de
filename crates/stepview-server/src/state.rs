//! Scene store and shared application state

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stepview_core::{
    AxisEntry, FrustumEntry, MeshData, MeshEntry, PointCloudEntry, SceneSnapshot, ViewerError,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;

const INITIAL_LABEL: &str = "initial";
const UPDATED_LABEL: &str = "updated";

/// Content that changes from step to step
#[derive(Debug, Clone)]
pub struct StepFrame {
    pub updated_mesh: Option<MeshEntry>,
    pub updated_point_cloud: Option<PointCloudEntry>,
    pub meshes: Vec<MeshEntry>,
    pub point_clouds: Vec<PointCloudEntry>,
    pub recorded_at: DateTime<Utc>,
}

impl StepFrame {
    fn empty() -> Self {
        Self {
            updated_mesh: None,
            updated_point_cloud: None,
            meshes: Vec::new(),
            point_clouds: Vec::new(),
            recorded_at: Utc::now(),
        }
    }
}

/// Step history entry for `GET /steps`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepInfo {
    pub index: u32,
    pub updated_mesh: Option<String>,
    pub updated_point_cloud: Option<String>,
    pub meshes: usize,
    pub point_clouds: usize,
    pub recorded_at: DateTime<Utc>,
}

/// Latest pushed scene plus a bounded per-step history.
///
/// Frustums, object axes, the initial point cloud and mesh and the global
/// axes flag are shared by every step. Updates record a new step that
/// carries the previous step's content forward.
#[derive(Debug, Clone)]
pub struct SceneStore {
    initial_point_cloud: Option<PointCloudEntry>,
    initial_mesh: Option<MeshEntry>,
    frustums: Vec<FrustumEntry>,
    axes: Vec<AxisEntry>,
    add_global_axes: bool,
    steps: VecDeque<StepFrame>,
    max_steps: usize,
}

impl SceneStore {
    pub fn new(max_steps: usize) -> Self {
        Self {
            initial_point_cloud: None,
            initial_mesh: None,
            frustums: Vec::new(),
            axes: Vec::new(),
            add_global_axes: false,
            steps: VecDeque::new(),
            max_steps: max_steps.max(1),
        }
    }

    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    /// Set the initial point cloud and mesh and turn on the global axes
    pub fn load_scene(&mut self, points: Option<Vec<[f32; 3]>>, mesh: Option<MeshData>) {
        self.initial_point_cloud = points.filter(|p| !p.is_empty()).map(|points| PointCloudEntry {
            points,
            color: None,
            label: Some(INITIAL_LABEL.to_string()),
        });
        self.initial_mesh = mesh.filter(|m| !m.vertices.is_empty()).map(|mesh| MeshEntry {
            mesh,
            color: None,
            label: Some(INITIAL_LABEL.to_string()),
        });
        self.add_global_axes = true;
        info!(
            point_cloud = self.initial_point_cloud.is_some(),
            mesh = self.initial_mesh.is_some(),
            "Scene loaded"
        );
    }

    /// Record a step whose updated mesh is `mesh`. Returns the step index.
    pub fn update_mesh(&mut self, mesh: MeshData, label: Option<String>) -> u32 {
        let entry = MeshEntry {
            mesh,
            color: None,
            label: Some(label.unwrap_or_else(|| UPDATED_LABEL.to_string())),
        };
        self.push_step(|frame| frame.updated_mesh = Some(entry))
    }

    /// Record a step whose updated point cloud is `points`. Returns the step index.
    pub fn update_point_cloud(&mut self, points: Vec<[f32; 3]>, label: Option<String>) -> u32 {
        let entry = PointCloudEntry {
            points,
            color: None,
            label: Some(label.unwrap_or_else(|| UPDATED_LABEL.to_string())),
        };
        self.push_step(|frame| frame.updated_point_cloud = Some(entry))
    }

    /// Append a mesh to the latest step. Returns the step index.
    pub fn add_mesh(&mut self, entry: MeshEntry) -> u32 {
        self.latest_step_mut().meshes.push(entry);
        self.total_steps() - 1
    }

    /// Append a point cloud to the latest step. Returns the step index.
    pub fn add_point_cloud(&mut self, entry: PointCloudEntry) -> u32 {
        self.latest_step_mut().point_clouds.push(entry);
        self.total_steps() - 1
    }

    pub fn add_frustum(&mut self, entry: FrustumEntry) {
        self.frustums.push(entry);
    }

    pub fn add_object_axis(&mut self, entry: AxisEntry) {
        self.axes.push(entry);
    }

    pub fn set_global_axes(&mut self) {
        self.add_global_axes = true;
    }

    /// Reset everything, including step history
    pub fn clear(&mut self) {
        *self = Self::new(self.max_steps);
        info!("Scene cleared");
    }

    /// Snapshot of the latest step, or of `step`
    pub fn snapshot(&self, step: Option<u32>) -> Result<SceneSnapshot, ViewerError> {
        let total = self.total_steps();
        let frame = match step {
            Some(step) => Some(
                self.steps
                    .get(step as usize)
                    .ok_or(ViewerError::StepOutOfRange { step, total })?,
            ),
            None => self.steps.back(),
        };

        Ok(SceneSnapshot {
            frustums: non_empty(&self.frustums),
            axes: non_empty(&self.axes),
            meshes: frame.and_then(|f| non_empty(&f.meshes)),
            initial_mesh: self.initial_mesh.clone(),
            updated_mesh: frame.and_then(|f| f.updated_mesh.clone()),
            point_clouds: frame.and_then(|f| non_empty(&f.point_clouds)),
            initial_point_cloud: self.initial_point_cloud.clone(),
            updated_point_cloud: frame.and_then(|f| f.updated_point_cloud.clone()),
            add_global_axes: self.add_global_axes,
            total_steps: Some(total),
        })
    }

    pub fn step_info(&self) -> Vec<StepInfo> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, frame)| StepInfo {
                index: index as u32,
                updated_mesh: frame.updated_mesh.as_ref().and_then(|e| e.label.clone()),
                updated_point_cloud: frame
                    .updated_point_cloud
                    .as_ref()
                    .and_then(|e| e.label.clone()),
                meshes: frame.meshes.len(),
                point_clouds: frame.point_clouds.len(),
                recorded_at: frame.recorded_at,
            })
            .collect()
    }

    fn push_step(&mut self, update: impl FnOnce(&mut StepFrame)) -> u32 {
        let mut frame = self.steps.back().cloned().unwrap_or_else(StepFrame::empty);
        frame.recorded_at = Utc::now();
        update(&mut frame);
        self.steps.push_back(frame);

        while self.steps.len() > self.max_steps {
            self.steps.pop_front();
        }
        let index = self.total_steps() - 1;
        debug!(step = index, "Recorded step");
        index
    }

    fn latest_step_mut(&mut self) -> &mut StepFrame {
        if self.steps.is_empty() {
            self.steps.push_back(StepFrame::empty());
        }
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items.to_vec())
}

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    store: RwLock<SceneStore>,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let store = SceneStore::new(config.scene.max_steps);
        Arc::new(Self {
            config,
            store: RwLock::new(store),
        })
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, SceneStore> {
        self.store.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, SceneStore> {
        self.store.write().await
    }
}
