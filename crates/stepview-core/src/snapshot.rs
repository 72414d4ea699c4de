//! Scene snapshot types as served by `GET /scene`
//!
//! Every field of a snapshot is optional. A missing field (or an empty list)
//! means "no content for this category at this step", never an error.

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

/// One server-provided description of everything to render at a given step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frustums: Option<Vec<FrustumEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<AxisEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meshes: Option<Vec<MeshEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_mesh: Option<MeshEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_mesh: Option<MeshEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_clouds: Option<Vec<PointCloudEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_point_cloud: Option<PointCloudEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_point_cloud: Option<PointCloudEntry>,
    #[serde(default)]
    pub add_global_axes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
}

impl SceneSnapshot {
    /// Parse a snapshot from a JSON response body
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Triangle mesh geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
}

/// Mesh entry: `{mesh: {vertices, faces}, color?, label?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshEntry {
    pub mesh: MeshData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Point cloud entry: `{points, color?, label?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudEntry {
    pub points: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Camera frustum entry
///
/// Without `intrinsics` (or with a zero-sized image) the camera is drawn as a
/// small marker cone instead of a wireframe frustum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrustumEntry {
    pub pose: Pose,
    /// 3x3 camera matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    #[serde(default, alias = "intrinsic", skip_serializing_if = "Option::is_none")]
    pub intrinsics: Option<[[f32; 3]; 3]>,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub visualize_orientation: bool,
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1.0
}

/// Object coordinate axes entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisEntry {
    pub pose: Pose,
    #[serde(default = "default_axis_label")]
    pub label: String,
}

fn default_axis_label() -> String {
    "Object".to_string()
}

/// 4x4 row-major pose matrix
///
/// Accepts nested rows (`[[..4]..4]`) or a flat array of 16 values on input,
/// and always serializes as nested rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRepr", into = "PoseRepr")]
pub struct Pose {
    m: [f32; 16],
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PoseRepr {
    Rows([[f32; 4]; 4]),
    Flat(Vec<f32>),
}

impl TryFrom<PoseRepr> for Pose {
    type Error = ViewerError;

    fn try_from(repr: PoseRepr) -> Result<Self> {
        match repr {
            PoseRepr::Rows(rows) => Ok(Self::from_rows(rows)),
            PoseRepr::Flat(values) => {
                let m: [f32; 16] = values
                    .as_slice()
                    .try_into()
                    .map_err(|_| ViewerError::InvalidPose(values.len()))?;
                Ok(Self { m })
            }
        }
    }
}

impl From<Pose> for PoseRepr {
    fn from(pose: Pose) -> Self {
        PoseRepr::Rows(pose.rows())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        let mut m = [0.0; 16];
        for (i, row) in rows.iter().enumerate() {
            m[i * 4..i * 4 + 4].copy_from_slice(row);
        }
        Self { m }
    }

    /// Pure translation pose
    pub fn from_translation(t: Vec3) -> Self {
        let mut pose = Self::IDENTITY;
        pose.m[3] = t.x;
        pose.m[7] = t.y;
        pose.m[11] = t.z;
        pose
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        let m = &self.m;
        [
            [m[0], m[1], m[2], m[3]],
            [m[4], m[5], m[6], m[7]],
            [m[8], m[9], m[10], m[11]],
            [m[12], m[13], m[14], m[15]],
        ]
    }

    /// Flattened row-major values
    pub fn as_slice(&self) -> &[f32; 16] {
        &self.m
    }

    pub fn to_mat4(&self) -> Mat4 {
        // glam is column-major
        Mat4::from_cols_array(&self.m).transpose()
    }

    /// Rotation part: columns 0..3 of the first three rows
    pub fn rotation(&self) -> Mat3 {
        let m = &self.m;
        Mat3::from_cols_array(&[m[0], m[4], m[8], m[1], m[5], m[9], m[2], m[6], m[10]])
    }

    /// Translation part: column 3 of the first three rows
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.m[3], self.m[7], self.m[11])
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.to_mat4().transform_point3(p)
    }
}

/// Linear RGB display color in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::from_u32(0xffffff);
    pub const RED: Rgb = Rgb::from_u32(0xff0000);
    pub const GREEN: Rgb = Rgb::from_u32(0x00ff00);
    pub const BLUE: Rgb = Rgb::from_u32(0x0000ff);
    pub const GRAY: Rgb = Rgb::from_u32(0x888888);

    pub const fn from_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Parse `#rrggbb`, `rrggbb` or `#rgb`
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(ViewerError::InvalidColor(s.to_string())),
        };
        u32::from_str_radix(&expanded, 16)
            .map(Self::from_u32)
            .map_err(|_| ViewerError::InvalidColor(s.to_string()))
    }

    /// Resolve an optional entry color, falling back to `default` when the
    /// color is absent or unparsable
    pub fn resolve(color: Option<&str>, default: Rgb) -> Rgb {
        match color {
            None => default,
            Some(s) => Self::from_hex(s).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring entry color");
                default
            }),
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}
