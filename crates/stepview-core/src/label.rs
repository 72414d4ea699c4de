//! Text labels: billboard sprites in the scene and status text in the panel

use glam::{Vec2, Vec3};

use crate::snapshot::Rgb;

/// Raster canvas size used for billboard text, in pixels
pub const LABEL_CANVAS: (u32, u32) = (256, 128);
/// Bold font size on the label canvas, in pixels
pub const LABEL_FONT_PX: f32 = 48.0;
/// World-space size of a label billboard
pub const LABEL_SCALE: Vec2 = Vec2::new(0.4, 0.2);

/// Placeholder shown when a status label has no content
pub const EMPTY_LABEL: &str = "None";

/// A billboard-style text sprite, always facing the camera
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSprite {
    pub text: String,
    pub color: Rgb,
    /// World-space anchor (sprite centre)
    pub position: Vec3,
    pub scale: Vec2,
}

impl LabelSprite {
    pub fn new(text: impl Into<String>, position: Vec3) -> Self {
        Self {
            text: text.into(),
            color: Rgb::WHITE,
            position,
            scale: LABEL_SCALE,
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// On-screen font size for a billboard of this scale whose world height
    /// spans `pixels_per_unit * scale.y` screen pixels
    pub fn font_px(&self, pixels_per_unit: f32) -> f32 {
        let sprite_px = self.scale.y * pixels_per_unit;
        sprite_px * LABEL_FONT_PX / LABEL_CANVAS.1 as f32
    }
}

/// Human-readable status text for point cloud and mesh content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabels {
    point_cloud: String,
    mesh: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            point_cloud: EMPTY_LABEL.to_string(),
            mesh: EMPTY_LABEL.to_string(),
        }
    }
}

impl StatusLabels {
    pub fn set_point_cloud(&mut self, label: impl Into<String>) {
        self.point_cloud = label.into();
    }

    pub fn set_mesh(&mut self, label: impl Into<String>) {
        self.mesh = label.into();
    }

    pub fn reset_point_cloud(&mut self) {
        self.point_cloud = EMPTY_LABEL.to_string();
    }

    pub fn reset_mesh(&mut self) {
        self.mesh = EMPTY_LABEL.to_string();
    }

    pub fn point_cloud_text(&self) -> String {
        format!("Point Cloud: {}", self.point_cloud)
    }

    pub fn mesh_text(&self) -> String {
        format!("Mesh: {}", self.mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        let mut labels = StatusLabels::default();
        assert_eq!(labels.point_cloud_text(), "Point Cloud: None");
        assert_eq!(labels.mesh_text(), "Mesh: None");

        labels.set_mesh("update_3");
        assert_eq!(labels.mesh_text(), "Mesh: update_3");
        labels.reset_mesh();
        assert_eq!(labels.mesh_text(), "Mesh: None");
    }

    #[test]
    fn test_font_scales_with_distance() {
        let label = LabelSprite::new("Obj", Vec3::ZERO);
        // 0.2 world units at 640 px/unit is a full 128 px canvas
        assert!((label.font_px(640.0) - LABEL_FONT_PX).abs() < 1e-3);
        assert!(label.font_px(100.0) < label.font_px(200.0));
    }
}
