//! Geometry builders
//!
//! Pure functions turning snapshot entries into renderer-agnostic primitives.
//! All positions are baked into world space, so a render surface only needs
//! to upload buffers.

use glam::Vec3;

use crate::label::LabelSprite;
use crate::snapshot::{AxisEntry, FrustumEntry, MeshEntry, PointCloudEntry, Pose, Rgb};

/// Fixed world-space point size for point clouds
pub const POINT_SIZE: f32 = 0.02;
/// Opacity of mesh surfaces and camera markers
pub const MESH_OPACITY: f32 = 0.5;
pub const MESH_METALNESS: f32 = 0.1;
pub const MESH_ROUGHNESS: f32 = 0.8;
/// Length of the triad drawn for an object axis entry
pub const AXIS_LENGTH: f32 = 0.2;
pub const AXIS_LABEL_OFFSET: f32 = 0.4;
pub const GLOBAL_AXIS_LENGTH: f32 = 0.5;
pub const GLOBAL_AXIS_LABEL_OFFSET: f32 = 0.6;
pub const GLOBAL_AXES_LABEL: &str = "Global Axes";
/// Length of the orientation triad drawn at a frustum's first near corner
pub const ORIENTATION_AXIS_LENGTH: f32 = 0.1;
pub const DEFAULT_FRUSTUM_COLOR: Rgb = Rgb::GREEN;

const MARKER_RADIUS: f32 = 0.05;
const MARKER_HEIGHT: f32 = 0.1;
const MARKER_SEGMENTS: u32 = 8;

/// Edges of a frustum as index pairs into [`frustum_corners`]:
/// near rectangle, far rectangle, then the four connecting edges.
pub const FRUSTUM_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// A renderable primitive in world space
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Points {
        positions: Vec<Vec3>,
        color: Rgb,
        size: f32,
    },
    Mesh(TriangleMesh),
    Lines(Vec<LineSegment>),
    Label(LabelSprite),
}

impl Primitive {
    /// Short kind name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Primitive::Points { .. } => "points",
            Primitive::Mesh(_) => "mesh",
            Primitive::Lines(_) => "lines",
            Primitive::Label(_) => "label",
        }
    }
}

/// Indexed triangle mesh with smooth normals
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub color: Rgb,
    pub opacity: f32,
    pub double_sided: bool,
    pub metalness: f32,
    pub roughness: f32,
    /// Flat color without lighting
    pub unlit: bool,
}

impl TriangleMesh {
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Colored line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub color: Rgb,
}

impl LineSegment {
    pub fn new(start: Vec3, end: Vec3, color: Rgb) -> Self {
        Self { start, end, color }
    }
}

/// Build a point cloud primitive
pub fn point_cloud(entry: &PointCloudEntry, default_color: Rgb) -> Primitive {
    Primitive::Points {
        positions: entry.points.iter().copied().map(Vec3::from).collect(),
        color: Rgb::resolve(entry.color.as_deref(), default_color),
        size: POINT_SIZE,
    }
}

/// Build a semi-transparent, double-sided triangle mesh
pub fn mesh(entry: &MeshEntry, default_color: Rgb) -> Primitive {
    let positions: Vec<Vec3> = entry.mesh.vertices.iter().copied().map(Vec3::from).collect();
    let normals = smooth_normals(&positions, &entry.mesh.faces);
    let indices = entry.mesh.faces.iter().flatten().copied().collect();

    Primitive::Mesh(TriangleMesh {
        positions,
        normals,
        indices,
        color: Rgb::resolve(entry.color.as_deref(), default_color),
        opacity: MESH_OPACITY,
        double_sided: true,
        metalness: MESH_METALNESS,
        roughness: MESH_ROUGHNESS,
        unlit: false,
    })
}

/// Area-weighted smooth vertex normals
///
/// Faces referencing out-of-range vertices are skipped. Vertices touched by
/// no valid face get a zero normal.
pub fn smooth_normals(positions: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for &face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        // Cross product length is twice the triangle area
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }

    normals.into_iter().map(|n| n.normalize_or_zero()).collect()
}

/// Back-project the four image corners at the near and far planes into
/// camera space.
///
/// Corner order per plane is `(0,0), (w,0), (w,h), (0,h)`; indices 0..4 are
/// the near plane and 4..8 the far plane.
pub fn frustum_corners(
    intrinsics: &[[f32; 3]; 3],
    width: f32,
    height: f32,
    near: f32,
    far: f32,
) -> [Vec3; 8] {
    let fx = intrinsics[0][0];
    let fy = intrinsics[1][1];
    let cx = intrinsics[0][2];
    let cy = intrinsics[1][2];

    let pixels = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)];
    let unproject = |(u, v): (f32, f32), depth: f32| {
        Vec3::new((u - cx) * depth / fx, (v - cy) * depth / fy, depth)
    };

    let mut corners = [Vec3::ZERO; 8];
    for (i, &px) in pixels.iter().enumerate() {
        corners[i] = unproject(px, near);
        corners[i + 4] = unproject(px, far);
    }
    corners
}

/// Build a frustum: a posed wireframe when intrinsics are known, otherwise a
/// camera marker cone
pub fn frustum(entry: &FrustumEntry) -> Primitive {
    let color = Rgb::resolve(entry.color.as_deref(), DEFAULT_FRUSTUM_COLOR);

    let intrinsics = match entry.intrinsics {
        Some(k) if entry.width > 0.0 && entry.height > 0.0 => k,
        _ => return camera_marker(&entry.pose, color),
    };

    let corners = frustum_corners(&intrinsics, entry.width, entry.height, entry.near, entry.far)
        .map(|c| entry.pose.transform_point(c));

    let mut segments: Vec<LineSegment> = FRUSTUM_EDGES
        .iter()
        .map(|&(a, b)| LineSegment::new(corners[a], corners[b], color))
        .collect();

    if entry.visualize_orientation {
        segments.extend(orientation_triad(&entry.pose, corners[0]));
    }

    Primitive::Lines(segments)
}

/// Tri-color triad anchored at `anchor`, oriented by the pose rotation
///
/// Directions are the unit basis vectors pushed through the pose with the
/// translation subtracted back out.
pub fn orientation_triad(pose: &Pose, anchor: Vec3) -> [LineSegment; 3] {
    let origin = pose.translation();
    let axis = |basis: Vec3, color: Rgb| {
        let dir = pose.transform_point(basis) - origin;
        LineSegment::new(anchor, anchor + dir * ORIENTATION_AXIS_LENGTH, color)
    };
    [
        axis(Vec3::X, Rgb::RED),
        axis(Vec3::Y, Rgb::GREEN),
        axis(Vec3::Z, Rgb::BLUE),
    ]
}

/// Tri-color axis triad (x red, y green, z blue) at a pose
pub fn axis_triad(pose: &Pose, length: f32) -> Vec<LineSegment> {
    let rotation = pose.rotation();
    let origin = pose.translation();
    [(Vec3::X, Rgb::RED), (Vec3::Y, Rgb::GREEN), (Vec3::Z, Rgb::BLUE)]
        .into_iter()
        .map(|(basis, color)| LineSegment::new(origin, origin + rotation * basis * length, color))
        .collect()
}

/// Object axes: a triad plus a label lifted above the origin
pub fn axes(entry: &AxisEntry) -> Vec<Primitive> {
    let origin = entry.pose.translation();
    vec![
        Primitive::Lines(axis_triad(&entry.pose, AXIS_LENGTH)),
        Primitive::Label(LabelSprite::new(
            &entry.label,
            origin + Vec3::Y * AXIS_LABEL_OFFSET,
        )),
    ]
}

/// The world reference frame drawn once at the origin
pub fn global_axes() -> Vec<Primitive> {
    vec![
        Primitive::Lines(axis_triad(&Pose::IDENTITY, GLOBAL_AXIS_LENGTH)),
        Primitive::Label(LabelSprite::new(
            GLOBAL_AXES_LABEL,
            Vec3::Y * GLOBAL_AXIS_LABEL_OFFSET,
        )),
    ]
}

/// Small cone with its apex at the camera centre, opening along +Z
pub fn camera_marker(pose: &Pose, color: Rgb) -> Primitive {
    let mut local = Vec::with_capacity(MARKER_SEGMENTS as usize + 2);
    local.push(Vec3::ZERO);
    for i in 0..MARKER_SEGMENTS {
        let angle = (i as f32 / MARKER_SEGMENTS as f32) * std::f32::consts::TAU;
        let (sin_a, cos_a) = angle.sin_cos();
        local.push(Vec3::new(cos_a * MARKER_RADIUS, sin_a * MARKER_RADIUS, MARKER_HEIGHT));
    }
    let base_center = local.len() as u32;
    local.push(Vec3::new(0.0, 0.0, MARKER_HEIGHT));

    let mut faces = Vec::with_capacity(MARKER_SEGMENTS as usize * 2);
    for i in 0..MARKER_SEGMENTS {
        let a = 1 + i;
        let b = 1 + (i + 1) % MARKER_SEGMENTS;
        faces.push([0, b, a]);
        faces.push([base_center, a, b]);
    }

    let positions: Vec<Vec3> = local.into_iter().map(|p| pose.transform_point(p)).collect();
    let normals = smooth_normals(&positions, &faces);

    Primitive::Mesh(TriangleMesh {
        positions,
        normals,
        indices: faces.into_iter().flatten().collect(),
        color,
        opacity: MESH_OPACITY,
        double_sided: true,
        metalness: 0.0,
        roughness: 1.0,
        unlit: true,
    })
}
