//! Scene reconciler
//!
//! [`SceneState`] owns everything the viewer mutates between polls: the
//! object-group registry, per-category visibility, the panel status labels
//! and the step cursor. [`SceneState::reconcile`] brings a render surface in
//! line with a freshly fetched snapshot, one category at a time.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::category::Category;
use crate::geometry::{self, Primitive};
use crate::label::StatusLabels;
use crate::registry::ObjectGroups;
use crate::snapshot::{Rgb, SceneSnapshot};
use crate::step::StepCursor;
use crate::surface::RenderSurface;
use crate::visibility::VisibilityState;

const UPDATED_POINT_CLOUD_LABEL: &str = "Updated Point Cloud";
const UPDATED_MESH_LABEL: &str = "Updated Mesh";

/// What a reconciliation pass did to one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// New renderables were inserted, replacing any previous set
    Built(usize),
    /// The category was absent and its previous renderables were removed
    Cleared,
    Unchanged,
}

/// Per-category outcome of [`SceneState::reconcile`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub changes: BTreeMap<Category, Change>,
    pub total_steps: Option<u32>,
}

impl ReconcileReport {
    pub fn change(&self, category: Category) -> Change {
        self.changes
            .get(&category)
            .copied()
            .unwrap_or(Change::Unchanged)
    }

    /// Number of renderables inserted across all categories
    pub fn built(&self) -> usize {
        self.changes
            .values()
            .map(|c| match c {
                Change::Built(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn cleared(&self) -> impl Iterator<Item = Category> + '_ {
        self.changes
            .iter()
            .filter(|(_, c)| **c == Change::Cleared)
            .map(|(c, _)| *c)
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (category, change) in &self.changes {
            let text = match change {
                Change::Built(n) => format!("{}+{}", category, n),
                Change::Cleared => format!("{}-", category),
                Change::Unchanged => continue,
            };
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(&text)?;
            first = false;
        }
        if first {
            f.write_str("no changes")?;
        }
        Ok(())
    }
}

/// Viewer-side scene state, owned by a single controller
#[derive(Debug, Clone)]
pub struct SceneState<H> {
    pub groups: ObjectGroups<H>,
    pub visibility: VisibilityState,
    pub labels: StatusLabels,
    pub steps: StepCursor,
}

impl<H> Default for SceneState<H> {
    fn default() -> Self {
        Self {
            groups: ObjectGroups::new(),
            visibility: VisibilityState::default(),
            labels: StatusLabels::default(),
            steps: StepCursor::default(),
        }
    }
}

impl<H: Clone + PartialEq + fmt::Debug> SceneState<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_global_axes(&self) -> bool {
        !self.groups.is_empty(Category::GlobalAxes)
    }

    /// Make the surface match `snapshot`.
    ///
    /// Categories present in the snapshot are rebuilt, absent ones are
    /// removed. Global axes are only ever added here, never removed.
    pub fn reconcile<S>(&mut self, surface: &mut S, snapshot: &SceneSnapshot) -> ReconcileReport
    where
        S: RenderSurface<Handle = H>,
    {
        let mut report = ReconcileReport::default();

        for category in Category::ALL {
            if category == Category::GlobalAxes {
                continue;
            }
            let change = match build_category(snapshot, category) {
                Some(primitives) => {
                    let handles: Vec<H> = primitives.iter().map(|p| surface.insert(p)).collect();
                    let count = handles.len();
                    self.groups.set(surface, category, handles);
                    Change::Built(count)
                }
                None if !self.groups.is_empty(category) => {
                    self.groups.clear(surface, category);
                    Change::Cleared
                }
                None => Change::Unchanged,
            };
            self.update_label(category, change, snapshot);
            report.changes.insert(category, change);
        }

        let axes_change = if snapshot.add_global_axes && self.add_global_axes(surface, false) {
            Change::Built(self.groups.get(Category::GlobalAxes).len())
        } else {
            Change::Unchanged
        };
        report.changes.insert(Category::GlobalAxes, axes_change);

        if let Some(total) = snapshot.total_steps {
            self.steps.set_total(total);
            report.total_steps = Some(total);
        }

        self.visibility.apply(&self.groups, surface);
        debug!(report = %report, "Reconciled snapshot");
        report
    }

    /// Draw the global reference frame.
    ///
    /// Without `force` this is a no-op when the triad already exists. With
    /// `force` the previous triad is released and exactly one fresh triad is
    /// inserted. Returns true when a triad was inserted.
    pub fn add_global_axes<S>(&mut self, surface: &mut S, force: bool) -> bool
    where
        S: RenderSurface<Handle = H>,
    {
        if self.has_global_axes() && !force {
            return false;
        }
        let handles: Vec<H> = geometry::global_axes()
            .iter()
            .map(|p| surface.insert(p))
            .collect();
        self.groups.set(surface, Category::GlobalAxes, handles);
        self.visibility.apply_category(
            Category::GlobalAxes,
            self.groups.get(Category::GlobalAxes),
            surface,
        );
        info!(forced = force, "Added global axes");
        true
    }

    /// Store a category's visibility flag and project it onto that category
    pub fn set_visibility<S>(&mut self, surface: &mut S, category: Category, visible: bool)
    where
        S: RenderSurface<Handle = H>,
    {
        self.visibility.set(category, visible);
        self.visibility
            .apply_category(category, self.groups.get(category), surface);
    }

    pub fn apply_visibility<S>(&self, surface: &mut S)
    where
        S: RenderSurface<Handle = H>,
    {
        self.visibility.apply(&self.groups, surface);
    }

    /// Release every renderable and reset the status labels
    pub fn teardown<S>(&mut self, surface: &mut S)
    where
        S: RenderSurface<Handle = H>,
    {
        self.groups.clear_all(surface);
        self.labels = StatusLabels::default();
    }

    fn update_label(&mut self, category: Category, change: Change, snapshot: &SceneSnapshot) {
        match (category, change) {
            (Category::UpdatedPointCloud, Change::Built(_)) => {
                let label = snapshot
                    .updated_point_cloud
                    .as_ref()
                    .and_then(|e| e.label.as_deref())
                    .unwrap_or(UPDATED_POINT_CLOUD_LABEL);
                self.labels.set_point_cloud(label);
            }
            (Category::UpdatedPointCloud, Change::Cleared) => self.labels.reset_point_cloud(),
            (Category::UpdatedMesh, Change::Built(_)) => {
                let label = snapshot
                    .updated_mesh
                    .as_ref()
                    .and_then(|e| e.label.as_deref())
                    .unwrap_or(UPDATED_MESH_LABEL);
                self.labels.set_mesh(label);
            }
            (Category::UpdatedMesh, Change::Cleared) => self.labels.reset_mesh(),
            _ => {}
        }
    }
}

/// Build a category's primitives, or `None` when the snapshot has no content
/// for it. Empty lists count as absent.
fn build_category(snapshot: &SceneSnapshot, category: Category) -> Option<Vec<Primitive>> {
    let primitives: Vec<Primitive> = match category {
        Category::InitialPointCloud => snapshot
            .initial_point_cloud
            .iter()
            .map(|e| geometry::point_cloud(e, Rgb::GRAY))
            .collect(),
        Category::UpdatedPointCloud => snapshot
            .updated_point_cloud
            .iter()
            .map(|e| geometry::point_cloud(e, Rgb::GREEN))
            .collect(),
        Category::PointClouds => snapshot
            .point_clouds
            .iter()
            .flatten()
            .map(|e| geometry::point_cloud(e, Rgb::GREEN))
            .collect(),
        Category::InitialMesh => snapshot
            .initial_mesh
            .iter()
            .map(|e| geometry::mesh(e, Rgb::GRAY))
            .collect(),
        Category::UpdatedMesh => snapshot
            .updated_mesh
            .iter()
            .map(|e| geometry::mesh(e, Rgb::GREEN))
            .collect(),
        Category::Meshes => snapshot
            .meshes
            .iter()
            .flatten()
            .map(|e| geometry::mesh(e, Rgb::GREEN))
            .collect(),
        Category::Frustums => snapshot
            .frustums
            .iter()
            .flatten()
            .map(geometry::frustum)
            .collect(),
        Category::Axes => snapshot
            .axes
            .iter()
            .flatten()
            .flat_map(geometry::axes)
            .collect(),
        Category::GlobalAxes => {
            if snapshot.add_global_axes {
                geometry::global_axes()
            } else {
                Vec::new()
            }
        }
    };
    (!primitives.is_empty()).then_some(primitives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;

    fn triangle_snapshot() -> SceneSnapshot {
        SceneSnapshot::from_json(
            r##"{"meshes":[{"mesh":{"vertices":[[0,0,0],[1,0,0],[0,1,0]],"faces":[[0,1,2]]},"color":"#ff0000"}]}"##,
        )
        .unwrap()
    }

    fn full_snapshot() -> SceneSnapshot {
        SceneSnapshot::from_json(
            r##"{
                "initial_point_cloud": {"points": [[0,0,0],[1,1,1]]},
                "updated_point_cloud": {"points": [[0,0,1]], "label": "iter_3"},
                "initial_mesh": {"mesh": {"vertices": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]]}},
                "updated_mesh": {"mesh": {"vertices": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]]}},
                "point_clouds": [{"points": [[2,0,0]]}, {"points": [[3,0,0]], "color": "#0000ff"}],
                "meshes": [{"mesh": {"vertices": [[0,0,0],[0,0,1],[0,1,0]], "faces": [[0,1,2]]}}],
                "frustums": [{"pose": [[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]], "color": "#00ffff"}],
                "axes": [{"pose": [[1,0,0,1],[0,1,0,0],[0,0,1,0],[0,0,0,1]], "label": "Cube"}],
                "add_global_axes": true,
                "total_steps": 4
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_triangle_then_empty_snapshot() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();

        let report = state.reconcile(&mut surface, &triangle_snapshot());
        assert_eq!(report.change(Category::Meshes), Change::Built(1));

        let handles = state.groups.get(Category::Meshes).to_vec();
        assert_eq!(handles.len(), 1);
        match &surface.node(handles[0]).unwrap().primitive {
            Primitive::Mesh(mesh) => {
                assert_eq!(mesh.face_count(), 1);
                assert_eq!(mesh.color, Rgb::RED);
            }
            other => panic!("expected mesh, got {}", other.kind()),
        }

        let report = state.reconcile(&mut surface, &SceneSnapshot::default());
        assert_eq!(report.change(Category::Meshes), Change::Cleared);
        assert!(state.groups.is_empty(Category::Meshes));
        assert!(surface.is_released(handles[0]));
        assert_eq!(surface.live_count(), 0);
    }

    #[test]
    fn test_absent_categories_are_cleared() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        state.reconcile(&mut surface, &full_snapshot());
        assert!(Category::ALL.iter().all(|c| !state.groups.is_empty(*c)));

        // Everything but global axes disappears on an empty snapshot
        let report = state.reconcile(&mut surface, &SceneSnapshot::default());
        let cleared: Vec<Category> = report.cleared().collect();
        assert_eq!(cleared.len(), 8);
        for category in Category::ALL {
            if category == Category::GlobalAxes {
                assert_eq!(state.groups.get(category).len(), 2);
            } else {
                assert!(state.groups.is_empty(category), "{category} not cleared");
            }
        }
        assert_eq!(surface.live_count(), 2);
        assert_eq!(state.labels.point_cloud_text(), "Point Cloud: None");
        assert_eq!(state.labels.mesh_text(), "Mesh: None");
    }

    #[test]
    fn test_replacement_releases_previous() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();

        state.reconcile(&mut surface, &full_snapshot());
        let before: Vec<u64> = Category::ALL
            .iter()
            .filter(|c| **c != Category::GlobalAxes)
            .flat_map(|c| state.groups.get(*c).to_vec())
            .collect();

        state.reconcile(&mut surface, &full_snapshot());
        assert!(before.iter().all(|id| surface.is_released(*id)));
        // Attached nodes are exactly the registry's contents
        assert_eq!(surface.attached_count(), state.groups.len());
        assert_eq!(surface.live_count(), state.groups.len());
    }

    #[test]
    fn test_empty_list_counts_as_absent() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        state.reconcile(&mut surface, &triangle_snapshot());

        let snapshot = SceneSnapshot::from_json(r#"{"meshes": []}"#).unwrap();
        let report = state.reconcile(&mut surface, &snapshot);
        assert_eq!(report.change(Category::Meshes), Change::Cleared);

        let report = state.reconcile(&mut surface, &snapshot);
        assert_eq!(report.change(Category::Meshes), Change::Unchanged);
    }

    #[test]
    fn test_global_axes_idempotent() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        let snapshot = SceneSnapshot {
            add_global_axes: true,
            ..Default::default()
        };

        let report = state.reconcile(&mut surface, &snapshot);
        assert_eq!(report.change(Category::GlobalAxes), Change::Built(2));
        let first = state.groups.get(Category::GlobalAxes).to_vec();

        for _ in 0..3 {
            let report = state.reconcile(&mut surface, &snapshot);
            assert_eq!(report.change(Category::GlobalAxes), Change::Unchanged);
        }
        assert_eq!(state.groups.get(Category::GlobalAxes), first.as_slice());
        assert_eq!(surface.live_count(), 2);

        // A snapshot without the flag leaves the triad alone
        state.reconcile(&mut surface, &SceneSnapshot::default());
        assert_eq!(state.groups.get(Category::GlobalAxes), first.as_slice());
    }

    #[test]
    fn test_forced_global_axes_replaces_triad() {
        let mut surface = HeadlessSurface::new();
        let mut state: SceneState<u64> = SceneState::new();

        assert!(state.add_global_axes(&mut surface, false));
        let first = state.groups.get(Category::GlobalAxes).to_vec();
        assert!(!state.add_global_axes(&mut surface, false));

        assert!(state.add_global_axes(&mut surface, true));
        let second = state.groups.get(Category::GlobalAxes).to_vec();
        assert_eq!(second.len(), first.len());
        assert_ne!(first, second);
        assert!(first.iter().all(|id| surface.is_released(*id)));
        assert_eq!(surface.live_count(), 2);
    }

    #[test]
    fn test_new_content_inherits_visibility() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();

        // Hiding an empty category is a no-op on the surface
        state.set_visibility(&mut surface, Category::Meshes, false);
        assert_eq!(surface.live_count(), 0);

        state.reconcile(&mut surface, &triangle_snapshot());
        let id = state.groups.get(Category::Meshes)[0];
        assert_eq!(surface.is_visible(id), Some(false));

        // Rebuilt content keeps the stored flag
        state.reconcile(&mut surface, &triangle_snapshot());
        let id = state.groups.get(Category::Meshes)[0];
        assert_eq!(surface.is_visible(id), Some(false));
    }

    #[test]
    fn test_toggle_changes_only_one_category() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        state.reconcile(&mut surface, &full_snapshot());

        let snapshot_flags = |surface: &HeadlessSurface| -> Vec<(u64, bool)> {
            surface.attached().map(|(id, n)| (id, n.visible)).collect()
        };
        let before = snapshot_flags(&surface);

        state.set_visibility(&mut surface, Category::Frustums, false);
        let frustums = state.groups.get(Category::Frustums).to_vec();
        for (id, visible) in snapshot_flags(&surface) {
            let was = before.iter().find(|(b, _)| *b == id).map(|(_, v)| *v);
            if frustums.contains(&id) {
                assert!(!visible);
            } else {
                assert_eq!(Some(visible), was);
            }
        }

        // Applying twice yields the same flags
        state.apply_visibility(&mut surface);
        let once = snapshot_flags(&surface);
        state.apply_visibility(&mut surface);
        assert_eq!(once, snapshot_flags(&surface));
    }

    #[test]
    fn test_labels_and_total_steps() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();

        let report = state.reconcile(&mut surface, &full_snapshot());
        assert_eq!(report.total_steps, Some(4));
        assert_eq!(state.steps.total(), Some(4));
        assert_eq!(state.labels.point_cloud_text(), "Point Cloud: iter_3");
        assert_eq!(state.labels.mesh_text(), "Mesh: Updated Mesh");
    }

    #[test]
    fn test_axes_entry_builds_triad_and_label() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        state.reconcile(&mut surface, &full_snapshot());

        let kinds: Vec<&str> = state
            .groups
            .get(Category::Axes)
            .iter()
            .map(|id| surface.node(*id).unwrap().primitive.kind())
            .collect();
        assert_eq!(kinds, ["lines", "label"]);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        state.reconcile(&mut surface, &full_snapshot());

        state.teardown(&mut surface);
        assert_eq!(surface.live_count(), 0);
        assert_eq!(state.groups.len(), 0);
        assert_eq!(state.labels, StatusLabels::default());
    }
}
