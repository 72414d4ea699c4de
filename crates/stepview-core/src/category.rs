//! Semantic categories of scene content

use serde::{Deserialize, Serialize};
use std::fmt;

/// One semantic kind of renderable content.
///
/// Every category owns its own object group and visibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    InitialPointCloud,
    UpdatedPointCloud,
    PointClouds,
    InitialMesh,
    UpdatedMesh,
    Meshes,
    Frustums,
    Axes,
    GlobalAxes,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::InitialPointCloud,
        Category::UpdatedPointCloud,
        Category::PointClouds,
        Category::InitialMesh,
        Category::UpdatedMesh,
        Category::Meshes,
        Category::Frustums,
        Category::Axes,
        Category::GlobalAxes,
    ];

    /// Stable snake_case name (matches the snapshot field where one exists)
    pub fn name(&self) -> &'static str {
        match self {
            Category::InitialPointCloud => "initial_point_cloud",
            Category::UpdatedPointCloud => "updated_point_cloud",
            Category::PointClouds => "point_clouds",
            Category::InitialMesh => "initial_mesh",
            Category::UpdatedMesh => "updated_mesh",
            Category::Meshes => "meshes",
            Category::Frustums => "frustums",
            Category::Axes => "axes",
            Category::GlobalAxes => "global_axes",
        }
    }

    /// Human-readable name for toggles
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::InitialPointCloud => "Initial Point Cloud",
            Category::UpdatedPointCloud => "Updated Point Cloud",
            Category::PointClouds => "Point Clouds",
            Category::InitialMesh => "Initial Mesh",
            Category::UpdatedMesh => "Updated Mesh",
            Category::Meshes => "Meshes",
            Category::Frustums => "Frustums",
            Category::Axes => "Object Axes",
            Category::GlobalAxes => "Global Axes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.name()));
        }
    }
}
