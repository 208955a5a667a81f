use egui::{vec2, Align, Layout, RichText, Ui};

use crate::session::{EditorEvent, EditorSession};
use crate::theme::ThemeColors;
use crate::ui_controls;

#[derive(Default)]
pub struct ActionBarOutput {
    pub save_copy: bool,
}

pub fn show_action_bar(
    ui: &mut Ui,
    session: &EditorSession,
    theme: &ThemeColors,
    events: &mut Vec<EditorEvent>,
) -> ActionBarOutput {
    let action_h = theme.metrics.action_height;
    let button = vec2(92.0, action_h);
    let mut out = ActionBarOutput::default();
    let has_annotations = session.log().can_undo();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing = vec2(14.0, 0.0);

        let undo = ui.add_enabled_ui(has_annotations, |ui| {
            ui_controls::ghost_button(ui, theme, "↩ Undo", button)
        });
        if undo.inner.on_hover_text("Ctrl+Z").clicked() {
            events.push(EditorEvent::Undo);
        }

        let clear = ui.add_enabled_ui(has_annotations, |ui| {
            ui_controls::danger_button(ui, theme, "Clear all", button)
        });
        if clear.inner.clicked() {
            events.push(EditorEvent::RequestClear);
        }

        let (width, height) = session.original().dimensions();
        ui.label(
            RichText::new(format!(
                "{width}×{height} · {} annotations · {:.0}%",
                session.log().len(),
                session.viewport().zoom() * 100.0
            ))
            .color(theme.text_muted)
            .size(12.0),
        );

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui_controls::primary_button(ui, theme, "Finish", button)
                .on_hover_text("Ctrl+Enter")
                .clicked()
            {
                events.push(EditorEvent::Finish);
            }
            if ui_controls::ghost_button(ui, theme, "Cancel", button).clicked() {
                events.push(EditorEvent::Cancel);
            }
            if ui_controls::ghost_button(ui, theme, "Save copy", button)
                .on_hover_text("Ctrl+S")
                .clicked()
            {
                out.save_copy = true;
            }
        });
    });

    out
}

/// Modal confirmation shown while a clear-all request is pending.
pub fn show_clear_dialog(ctx: &egui::Context, theme: &ThemeColors, events: &mut Vec<EditorEvent>) {
    egui::Window::new("Clear all annotations?")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label("Every annotation will be removed and the original capture restored.");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui_controls::danger_button(ui, theme, "Clear", vec2(90.0, 28.0)).clicked() {
                    events.push(EditorEvent::ConfirmClear);
                }
                if ui_controls::ghost_button(ui, theme, "Keep", vec2(90.0, 28.0)).clicked() {
                    events.push(EditorEvent::DismissClear);
                }
            });
        });
}
