//! Bevy application setup

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;

use crate::network::{NetworkPlugin, ViewerConfig};
use crate::scene::ScenePlugin;
use crate::ui::UiPlugin;

/// Camera orbit settings (Y-up)
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3, // For smooth re-centering
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            // Looking down -Z from (0, 0, 2)
            distance: 2.0,
            target_distance: 2.0,
            azimuth: 0.0,
            elevation: 0.0,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        }
    }
}

impl CameraSettings {
    /// Camera eye position on the orbit sphere
    pub fn eye(&self) -> Vec3 {
        let x = self.distance * self.azimuth.sin() * self.elevation.cos();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.azimuth.cos() * self.elevation.cos();
        self.target + Vec3::new(x, y, z)
    }
}

/// Build the viewer application without running it
pub fn build(config: ViewerConfig) -> App {
    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Stepview".to_string(),
                        canvas: Some("#stepview-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                // Entry points install their own tracing subscriber
                .disable::<LogPlugin>(),
        )
        // bevy_picking must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(config)
        .init_resource::<CameraSettings>()
        .add_plugins(NetworkPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(UiPlugin);
    app
}

/// Run the Bevy application
pub fn run(config: ViewerConfig) {
    build(config).run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye_matches_initial_view() {
        let settings = CameraSettings::default();
        assert!((settings.eye() - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_eye_elevation_is_y_up() {
        let settings = CameraSettings {
            elevation: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        let eye = settings.eye();
        assert!((eye.y - 2.0).abs() < 1e-5);
    }
}
