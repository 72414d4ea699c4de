//! Bevy render surface: core primitives as entities and assets

use std::collections::HashMap;

use bevy::asset::RenderAssetUsages;
use bevy::ecs::system::SystemParam;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use stepview_core::geometry::TriangleMesh;
use stepview_core::{LabelSprite, LineSegment, Primitive, RenderSurface, Rgb};

/// Mesh and material owned by one scene node
#[derive(Debug, Clone)]
pub struct NodeHandles {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

/// Graphics assets of every live node, keyed by entity
#[derive(Debug, Default, Resource)]
pub struct NodeAssets(pub HashMap<Entity, NodeHandles>);

/// Marker for entities created from scene snapshots
#[derive(Component)]
pub struct SceneNode;

/// Billboard text anchored at the entity's translation
#[derive(Debug, Clone, Component)]
pub struct WorldLabel(pub LabelSprite);

/// Everything needed to add and remove scene nodes from a system
#[derive(SystemParam)]
pub struct BevySurface<'w, 's> {
    commands: Commands<'w, 's>,
    meshes: ResMut<'w, Assets<Mesh>>,
    materials: ResMut<'w, Assets<StandardMaterial>>,
    nodes: ResMut<'w, NodeAssets>,
}

impl<'w, 's> RenderSurface for BevySurface<'w, 's> {
    type Handle = Entity;

    fn insert(&mut self, primitive: &Primitive) -> Entity {
        let (mesh, material) = match primitive {
            Primitive::Points {
                positions,
                color,
                size,
            } => (points_mesh(positions, *size), unlit_material(*color)),
            Primitive::Mesh(triangles) => (triangle_mesh(triangles), shaded_material(triangles)),
            Primitive::Lines(segments) => (line_mesh(segments), unlit_material(Rgb::WHITE)),
            Primitive::Label(sprite) => {
                return self
                    .commands
                    .spawn((
                        WorldLabel(sprite.clone()),
                        Transform::from_translation(sprite.position),
                        Visibility::Visible,
                        SceneNode,
                    ))
                    .id();
            }
        };
        let mesh = self.meshes.add(mesh);
        let material = self.materials.add(material);

        let entity = self
            .commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                Transform::IDENTITY,
                Visibility::Visible,
                SceneNode,
            ))
            .id();
        self.nodes.0.insert(entity, NodeHandles { mesh, material });
        entity
    }

    fn detach(&mut self, handle: &Entity) {
        self.commands.entity(*handle).try_despawn();
    }

    fn release(&mut self, handle: Entity) {
        if let Some(assets) = self.nodes.0.remove(&handle) {
            self.meshes.remove(&assets.mesh);
            self.materials.remove(&assets.material);
        }
    }

    fn set_visible(&mut self, handle: &Entity, visible: bool) {
        let visibility = if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        self.commands.entity(*handle).try_insert(visibility);
    }
}

fn color_of(rgb: Rgb) -> Color {
    Color::srgb(rgb.r, rgb.g, rgb.b)
}

/// Vertex directions of the octahedron drawn for each point
const POINT_OFFSETS: [Vec3; 6] = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
const POINT_FACES: [[u32; 3]; 8] = [
    [0, 2, 4],
    [2, 1, 4],
    [1, 3, 4],
    [3, 0, 4],
    [2, 0, 5],
    [1, 2, 5],
    [3, 1, 5],
    [0, 3, 5],
];

/// One small octahedron per point, `size` across in world units.
///
/// Point-list topology is fixed at 1px on WebGPU, so points are expanded to
/// geometry instead.
pub fn points_mesh(positions: &[Vec3], size: f32) -> Mesh {
    let half = size * 0.5;
    let mut vertices = Vec::with_capacity(positions.len() * POINT_OFFSETS.len());
    let mut normals = Vec::with_capacity(vertices.capacity());
    let mut indices = Vec::with_capacity(positions.len() * POINT_FACES.len() * 3);

    for (i, point) in positions.iter().enumerate() {
        let base = (i * POINT_OFFSETS.len()) as u32;
        for offset in POINT_OFFSETS {
            vertices.push((*point + offset * half).to_array());
            normals.push(offset.to_array());
        }
        indices.extend(POINT_FACES.iter().flatten().map(|k| base + k));
    }

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, vertices)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(indices))
}

/// Line list mesh with per-vertex colors
pub fn line_mesh(segments: &[LineSegment]) -> Mesh {
    let mut positions = Vec::with_capacity(segments.len() * 2);
    let mut colors = Vec::with_capacity(segments.len() * 2);
    for segment in segments {
        let [r, g, b] = segment.color.to_array();
        positions.push(segment.start.to_array());
        positions.push(segment.end.to_array());
        colors.push([r, g, b, 1.0]);
        colors.push([r, g, b, 1.0]);
    }
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

/// Indexed triangle mesh with the builder's smooth normals
pub fn triangle_mesh(triangles: &TriangleMesh) -> Mesh {
    let positions: Vec<[f32; 3]> = triangles.positions.iter().map(|p| p.to_array()).collect();
    let normals: Vec<[f32; 3]> = triangles.normals.iter().map(|n| n.to_array()).collect();
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(triangles.indices.clone()))
}

fn unlit_material(color: Rgb) -> StandardMaterial {
    StandardMaterial {
        base_color: color_of(color),
        unlit: true,
        ..default()
    }
}

fn shaded_material(triangles: &TriangleMesh) -> StandardMaterial {
    StandardMaterial {
        base_color: color_of(triangles.color).with_alpha(triangles.opacity),
        alpha_mode: AlphaMode::Blend,
        double_sided: triangles.double_sided,
        cull_mode: if triangles.double_sided {
            None
        } else {
            StandardMaterial::default().cull_mode
        },
        metallic: triangles.metalness,
        perceptual_roughness: triangles.roughness,
        unlit: triangles.unlit,
        ..default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::mesh::VertexAttributeValues;
    use stepview_core::{geometry, MeshData, MeshEntry};

    #[test]
    fn test_line_mesh_has_two_vertices_per_segment() {
        let segments = geometry::axis_triad(&stepview_core::Pose::IDENTITY, 1.0);
        let mesh = line_mesh(&segments);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineList);
        assert_eq!(mesh.count_vertices(), 6);
        match mesh.attribute(Mesh::ATTRIBUTE_COLOR) {
            Some(VertexAttributeValues::Float32x4(colors)) => {
                assert_eq!(colors[0], [1.0, 0.0, 0.0, 1.0]);
            }
            other => panic!("unexpected colors: {:?}", other),
        }
    }

    #[test]
    fn test_triangle_mesh_keeps_indices() {
        let entry = MeshEntry {
            mesh: MeshData {
                vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                faces: vec![[0, 1, 2]],
            },
            color: None,
            label: None,
        };
        let Primitive::Mesh(triangles) = geometry::mesh(&entry, Rgb::GRAY) else {
            panic!("expected a mesh primitive");
        };
        let mesh = triangle_mesh(&triangles);
        assert_eq!(mesh.count_vertices(), 3);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3));

        let material = shaded_material(&triangles);
        assert_eq!(material.alpha_mode, AlphaMode::Blend);
        assert!(material.cull_mode.is_none());
    }

    #[test]
    fn test_points_mesh_is_sized() {
        let mesh = points_mesh(&[Vec3::ZERO, Vec3::ONE], 0.02);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::TriangleList);
        assert_eq!(mesh.count_vertices(), 12);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(48));
        match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(positions)) => {
                assert_eq!(positions[0], [0.01, 0.0, 0.0]);
                let shifted = Vec3::from_array(positions[6]) - Vec3::ONE;
                assert!((shifted - Vec3::new(0.01, 0.0, 0.0)).length() < 1e-6);
            }
            other => panic!("unexpected positions: {:?}", other),
        }
    }

    #[test]
    fn test_camera_marker_material_is_unlit() {
        let Primitive::Mesh(marker) =
            geometry::camera_marker(&stepview_core::Pose::IDENTITY, Rgb::RED)
        else {
            panic!("expected a mesh primitive");
        };
        assert!(shaded_material(&marker).unlit);
    }
}
