//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use stepview_core::{Category, StepCursor, StepInput};

use crate::network::{ConnectionStatus, ViewerConfig};
use crate::scene::{MainCamera, ResetGlobalAxes, SetCategoryVisibility, ViewerScene};
use crate::surface::WorldLabel;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StepControls>()
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, (control_panel, draw_world_labels));
    }
}

/// Text state of the numeric step input
#[derive(Resource, Default, Debug)]
pub struct StepControls {
    pub input: StepInput,
}

fn control_panel(
    mut contexts: EguiContexts,
    mut scene: ResMut<ViewerScene>,
    mut controls: ResMut<StepControls>,
    status: Res<ConnectionStatus>,
    config: Res<ViewerConfig>,
    mut visibility_events: MessageWriter<SetCategoryVisibility>,
    mut reset_events: MessageWriter<ResetGlobalAxes>,
) {
    // Get the egui context - early return if not available
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::SidePanel::left("controls_panel")
        .default_width(240.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Stepview");

            ui.horizontal(|ui| {
                let (color, text) = match status.connected {
                    Some(true) => (egui::Color32::GREEN, "Connected"),
                    Some(false) => (egui::Color32::RED, "Poll failed"),
                    None => (egui::Color32::GRAY, "Connecting..."),
                };
                ui.colored_label(color, "●");
                ui.label(text);
            });
            if !config.server_url.is_empty() {
                ui.label(egui::RichText::new(&config.server_url).small().weak());
            }

            ui.separator();
            ui.label(scene.state.labels.point_cloud_text());
            ui.label(scene.state.labels.mesh_text());

            ui.separator();
            ui.strong("Layers");
            for category in Category::ALL {
                let mut visible = scene.state.visibility.is_visible(category);
                if ui.checkbox(&mut visible, category.display_name()).changed() {
                    visibility_events.write(SetCategoryVisibility { category, visible });
                }
            }
            if ui.button("Reset global axes").clicked() {
                reset_events.write(ResetGlobalAxes);
            }

            ui.separator();
            step_controls(ui, &mut scene.state.steps, &mut controls.input);
        });
}

/// Step slider, numeric input and live toggle
/// Select a step, logging rejected selections
fn select_step(steps: &mut StepCursor, step: u32) -> bool {
    match steps.select(step) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring step selection");
            false
        }
    }
}

fn step_controls(ui: &mut egui::Ui, steps: &mut StepCursor, input: &mut StepInput) {
    ui.strong("Step");

    let Some(max_step) = steps.max_step() else {
        ui.label("No steps");
        return;
    };
    ui.label(format!("{} steps", max_step + 1));

    let mut live = steps.is_following_latest();
    if ui.checkbox(&mut live, "Live").changed() {
        if live {
            steps.follow_latest();
        } else if let Some(step) = steps.display_step() {
            // Pin the step currently shown
            select_step(steps, step);
        }
    }

    let mut slider_value = steps.display_step().unwrap_or(0);
    let slider = ui.add(egui::Slider::new(&mut slider_value, 0..=max_step).text("step"));
    if slider.changed() {
        select_step(steps, slider_value);
    }

    // The input keeps its own text while focused
    input.sync(steps);
    let mut text = input.text().to_string();
    let response = ui.add(egui::TextEdit::singleline(&mut text).desired_width(80.0));
    if response.has_focus() && !input.is_focused() {
        input.focus();
    }
    if response.changed() {
        input.set_text(text);
    }
    if response.lost_focus() {
        if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            input.commit(steps);
        }
        input.blur(steps);
    }
}

/// Paint label billboards screen-aligned at their projected anchors
fn draw_world_labels(
    mut contexts: EguiContexts,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    labels: Query<(&WorldLabel, &GlobalTransform, &Visibility)>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let painter = ctx.layer_painter(egui::LayerId::background());
    let up = camera_transform.up().as_vec3();

    for (label, transform, visibility) in labels.iter() {
        if *visibility == Visibility::Hidden {
            continue;
        }
        let anchor = transform.translation();
        let Ok(screen) = camera.world_to_viewport(camera_transform, anchor) else {
            continue;
        };
        let Ok(above) = camera.world_to_viewport(camera_transform, anchor + up) else {
            continue;
        };
        let pixels_per_unit = screen.distance(above);
        let font_px = label.0.font_px(pixels_per_unit);
        if font_px < 4.0 {
            continue;
        }

        let [r, g, b] = label.0.color.to_array();
        painter.text(
            egui::pos2(screen.x, screen.y),
            egui::Align2::CENTER_CENTER,
            &label.0.text,
            egui::FontId::proportional(font_px),
            egui::Color32::from_rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_step_rejects_missing_step() {
        let mut steps = StepCursor::default();
        steps.set_total(3);
        assert!(select_step(&mut steps, 2));
        assert!(!select_step(&mut steps, 3));
        assert_eq!(steps.selected(), Some(2));
    }
}
