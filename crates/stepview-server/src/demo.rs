//! Orbit demo: pushes a moving mesh, frustums and axes to a running server

use anyhow::{Context, Result};
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::TAU;
use std::time::Duration;
use stepview_core::{AxisEntry, FrustumEntry, MeshData, Pose};
use tracing::{info, warn};

use crate::client::ViewerClient;

const CUBE_HALF_SIZE: f32 = 0.1;
const CLOUD_POINTS: usize = 500;
const CLOUD_RADIUS: f32 = 0.3;
const FRUSTUM_OFFSET: Vec3 = Vec3::splat(0.2);
const KNOWN_CAMERA: Vec3 = Vec3::splat(0.5);

/// Demo run parameters
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub host: String,
    pub iterations: u32,
    pub interval: Duration,
}

/// Camera-to-world pose at `eye` looking toward `target`.
///
/// Rotation columns are right, up and forward (camera +Z looks at the target).
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Pose {
    let forward = (target - eye).normalize_or_zero();
    let right = up.cross(forward).normalize_or_zero();
    let true_up = forward.cross(right);
    pose_from_mat4(Mat4::from_cols(
        right.extend(0.0),
        true_up.extend(0.0),
        forward.extend(0.0),
        eye.extend(1.0),
    ))
}

fn pose_from_mat4(m: Mat4) -> Pose {
    Pose::from_rows([
        m.row(0).to_array(),
        m.row(1).to_array(),
        m.row(2).to_array(),
        m.row(3).to_array(),
    ])
}

/// Axis-aligned cube centered at the origin
pub fn cube(half: f32) -> MeshData {
    let vertices = (0..8)
        .map(|i| {
            let sign = |bit: u32| if i & bit == 0 { -half } else { half };
            [sign(1), sign(2), sign(4)]
        })
        .collect();
    // Vertex index bits: x=1, y=2, z=4
    let faces = vec![
        [0, 2, 3], [0, 3, 1], // -z
        [4, 5, 7], [4, 7, 6], // +z
        [0, 1, 5], [0, 5, 4], // -y
        [2, 6, 7], [2, 7, 3], // +y
        [0, 4, 6], [0, 6, 2], // -x
        [1, 3, 7], [1, 7, 5], // +x
    ];
    MeshData { vertices, faces }
}

/// Evenly spread points on a sphere (Fibonacci lattice)
pub fn sphere_cloud(count: usize, radius: f32) -> Vec<[f32; 3]> {
    let golden = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            [radius * r * theta.cos(), radius * y, radius * r * theta.sin()]
        })
        .collect()
}

fn transform_mesh(mesh: &MeshData, rotation: Quat, translation: Vec3) -> MeshData {
    MeshData {
        vertices: mesh
            .vertices
            .iter()
            .map(|&v| (rotation * Vec3::from_array(v) + translation).to_array())
            .collect(),
        faces: mesh.faces.clone(),
    }
}

fn camera_frustum(pose: Pose, color: &str) -> FrustumEntry {
    FrustumEntry {
        pose,
        intrinsics: Some([[500.0, 0.0, 320.0], [0.0, 500.0, 240.0], [0.0, 0.0, 1.0]]),
        width: 640.0,
        height: 480.0,
        near: 0.05,
        far: 0.15,
        color: Some(color.to_string()),
        visualize_orientation: true,
    }
}

/// Position on the unit orbit for iteration `i` of `n`
pub fn orbit_position(i: u32, n: u32) -> (f32, Vec3) {
    let theta = TAU * i as f32 / n.max(1) as f32;
    (theta, Vec3::new(theta.cos(), 0.0, theta.sin()))
}

/// Run the demo against `options.host`
pub async fn run(options: DemoOptions) -> Result<()> {
    let client = ViewerClient::new(&options.host)?;
    client
        .health()
        .await
        .with_context(|| format!("Scene server not reachable at {}", client.base_url()))?;

    info!(host = %client.base_url(), iterations = options.iterations, "Starting demo");

    let base = cube(CUBE_HALF_SIZE);
    client.clear_scene().await?;
    client
        .load_scene(Some(sphere_cloud(CLOUD_POINTS, CLOUD_RADIUS)), Some(base.clone()))
        .await?;
    client
        .add_frustum(&camera_frustum(
            look_at(KNOWN_CAMERA, Vec3::ZERO, Vec3::Y),
            "#ff0000",
        ))
        .await?;

    for i in 0..options.iterations {
        let (theta, position) = orbit_position(i, options.iterations);
        let rotation = Quat::from_rotation_y(-theta);

        let frustum = camera_frustum(
            look_at(position + FRUSTUM_OFFSET, position, Vec3::Y),
            "#00ff00",
        );
        let axis = AxisEntry {
            pose: pose_from_mat4(Mat4::from_rotation_translation(rotation, position)),
            label: format!("Obj {}", i + 1),
        };
        let mesh = transform_mesh(&base, rotation, position);

        let pushed = async {
            client.add_frustum(&frustum).await?;
            client.add_object_axis(&axis).await?;
            client
                .update_mesh(mesh, Some(format!("update_{}", i + 1)))
                .await
        }
        .await;

        match pushed {
            Ok(ack) => info!(step = ack.step, total = ack.total_steps, "Pushed iteration {}", i + 1),
            Err(e) => warn!(error = %e, iteration = i + 1, "Demo push failed"),
        }

        tokio::time::sleep(options.interval).await;
    }

    info!("Demo finished");
    Ok(())
}
