//! Stepview Core - Scene snapshots and scene-state reconciliation
//!
//! This crate provides the renderer-agnostic part of the Stepview viewer:
//! - Scene snapshot types as served by `GET /scene`
//! - Geometry builders turning raw arrays into renderable primitives
//! - The object-group registry and visibility applier
//! - The scene reconciler that keeps a render surface in sync with snapshots
//! - Step cursor and poll schedule driving the fetch loop

pub mod category;
pub mod error;
pub mod geometry;
pub mod label;
pub mod poll;
pub mod reconcile;
pub mod registry;
pub mod snapshot;
pub mod step;
pub mod surface;
pub mod visibility;

pub use category::Category;
pub use error::{Result, ViewerError};
pub use geometry::{LineSegment, Primitive};
pub use label::{LabelSprite, StatusLabels};
pub use poll::{scene_url, PollHandle, PollRequest, PollSchedule};
pub use reconcile::{Change, ReconcileReport, SceneState};
pub use registry::ObjectGroups;
pub use snapshot::{
    AxisEntry, FrustumEntry, MeshData, MeshEntry, PointCloudEntry, Pose, Rgb, SceneSnapshot,
};
pub use step::{StepCursor, StepInput};
pub use surface::{HeadlessSurface, RenderSurface};
pub use visibility::VisibilityState;
