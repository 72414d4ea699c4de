//! 3D scene management

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use stepview_core::{Category, SceneState};

use crate::app::CameraSettings;
use crate::surface::{BevySurface, NodeAssets};

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerScene>()
            .init_resource::<NodeAssets>()
            .add_message::<SetCategoryVisibility>()
            .add_message::<ResetGlobalAxes>()
            .add_systems(Startup, setup_scene)
            .add_systems(
                Update,
                (update_camera, follow_camera_light, handle_scene_controls),
            )
            .add_systems(Last, teardown_on_exit);
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Marker for the directional light that tracks the camera
#[derive(Component)]
pub struct CameraLight;

/// Scene state shared by the poll loop and the controls
#[derive(Resource, Default)]
pub struct ViewerScene {
    pub state: SceneState<Entity>,
}

/// Visibility checkbox changed
#[derive(Message, Debug, Clone, Copy)]
pub struct SetCategoryVisibility {
    pub category: Category,
    pub visible: bool,
}

/// "Reset global axes" pressed
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ResetGlobalAxes;

fn setup_scene(mut commands: Commands, settings: Res<CameraSettings>) {
    let eye = settings.eye();
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 60f32.to_radians(),
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        Transform::from_translation(eye).looking_at(settings.target, Vec3::Y),
        AmbientLight {
            color: Color::WHITE,
            brightness: 400.0,
            ..default()
        },
        MainCamera,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 5000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(eye).looking_at(settings.target, Vec3::Y),
        CameraLight,
    ));
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Leave the pointer to egui while it is over the panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);
    let motion = mouse_motion.delta;

    if !egui_wants_pointer {
        // Orbit with left mouse drag
        if mouse_button.pressed(MouseButton::Left) {
            settings.azimuth -= motion.x * settings.sensitivity;
            settings.elevation = (settings.elevation + motion.y * settings.sensitivity).clamp(-1.5, 1.5);
        }

        // Pan in the view plane with right mouse drag
        if mouse_button.pressed(MouseButton::Right) {
            let right = Vec3::new(settings.azimuth.cos(), 0.0, -settings.azimuth.sin());
            let pan_speed = settings.distance * 0.002;
            settings.target_focus -= right * motion.x * pan_speed;
            settings.target_focus += Vec3::Y * motion.y * pan_speed;
        }

        let scroll = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / 100.0,
        };
        if scroll != 0.0 {
            let zoom_factor = 1.0 - scroll * settings.zoom_speed;
            settings.target_distance = (settings.target_distance * zoom_factor).clamp(0.05, 50.0);
        }
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}

/// Keep the key light at the camera, pointing where it looks
fn follow_camera_light(
    camera_query: Query<&Transform, (With<MainCamera>, Without<CameraLight>)>,
    mut light_query: Query<&mut Transform, With<CameraLight>>,
) {
    let Ok(camera) = camera_query.single() else {
        return;
    };
    for mut light in light_query.iter_mut() {
        *light = *camera;
    }
}

/// Apply visibility toggles and global-axes resets from the panel
fn handle_scene_controls(
    mut visibility_events: MessageReader<SetCategoryVisibility>,
    mut reset_events: MessageReader<ResetGlobalAxes>,
    mut scene: ResMut<ViewerScene>,
    mut surface: BevySurface,
) {
    for event in visibility_events.read() {
        tracing::debug!(category = %event.category, visible = event.visible, "Visibility toggled");
        scene
            .state
            .set_visibility(&mut surface, event.category, event.visible);
    }
    if reset_events.read().count() > 0 {
        scene.state.add_global_axes(&mut surface, true);
    }
}

fn teardown_on_exit(
    mut exits: MessageReader<AppExit>,
    mut scene: ResMut<ViewerScene>,
    mut surface: BevySurface,
) {
    if exits.read().next().is_some() {
        scene.state.teardown(&mut surface);
    }
}
