use egui::{vec2, Color32, Frame, Margin, RichText, Rounding, Sense, Stroke, Ui, Vec2};

use crate::theme::ThemeColors;

pub fn card_frame(theme: &ThemeColors) -> Frame {
    Frame::none()
        .fill(theme.card)
        .rounding(Rounding::same(theme.metrics.rounding * 1.5))
        .stroke(Stroke::new(1.0, theme.border))
        .inner_margin(Margin::symmetric(16.0, 12.0))
}

pub fn toolbar_frame(theme: &ThemeColors) -> Frame {
    Frame::none()
        .fill(theme.panel)
        .rounding(Rounding::ZERO)
        .inner_margin(Margin::symmetric(
            theme.metrics.panel_padding_x,
            theme.metrics.panel_padding_y,
        ))
}

pub fn action_bar_frame(theme: &ThemeColors) -> Frame {
    Frame::none()
        .fill(theme.panel)
        .rounding(Rounding::ZERO)
        .inner_margin(Margin::symmetric(theme.metrics.panel_padding_x, 10.0))
}

pub fn tool_chip(ui: &mut Ui, theme: &ThemeColors, label: &str, selected: bool) -> egui::Response {
    let mut button = egui::Button::new(RichText::new(label).size(theme.metrics.icon_size))
        .min_size(vec2(theme.metrics.chip_w, theme.metrics.chip_h))
        .rounding(Rounding::same(theme.metrics.chip_rounding));

    if selected {
        button = button
            .fill(theme.primary_soft)
            .stroke(Stroke::new(1.0, theme.primary));
    } else {
        button = button.fill(theme.card);
    }

    ui.add(button)
}

pub fn color_chip(ui: &mut Ui, theme: &ThemeColors, color: Color32, selected: bool) -> egui::Response {
    let mut button = egui::Button::new("")
        .min_size(vec2(22.0, 22.0))
        .fill(color)
        .rounding(Rounding::same(11.0));

    if selected {
        button = button.stroke(Stroke::new(2.0, theme.primary));
    } else {
        button = button.stroke(Stroke::new(1.0, theme.border));
    }

    ui.add(button)
}

pub fn primary_button(ui: &mut Ui, theme: &ThemeColors, label: &str, min_size: Vec2) -> egui::Response {
    ui.add(
        egui::Button::new(RichText::new(label).strong().color(Color32::WHITE))
            .min_size(min_size)
            .fill(theme.primary)
            .rounding(Rounding::same(theme.metrics.rounding)),
    )
}

pub fn ghost_button(ui: &mut Ui, theme: &ThemeColors, label: &str, min_size: Vec2) -> egui::Response {
    ui.add(
        egui::Button::new(RichText::new(label).color(theme.text))
            .min_size(min_size)
            .fill(theme.card)
            .stroke(Stroke::new(1.0, theme.border))
            .rounding(Rounding::same(theme.metrics.rounding)),
    )
}

pub fn danger_button(ui: &mut Ui, theme: &ThemeColors, label: &str, min_size: Vec2) -> egui::Response {
    ui.add(
        egui::Button::new(RichText::new(label).color(theme.danger))
            .min_size(min_size)
            .fill(theme.card)
            .stroke(Stroke::new(1.0, theme.danger))
            .rounding(Rounding::same(theme.metrics.rounding)),
    )
}

pub fn muted_label(ui: &mut Ui, theme: &ThemeColors, text: &str) {
    ui.label(RichText::new(text).color(theme.text_muted).size(12.0));
}

pub fn vertical_divider(ui: &mut Ui, theme: &ThemeColors, height: f32) {
    let (rect, _) = ui.allocate_exact_size(vec2(1.0, height), Sense::hover());
    ui.painter().line_segment(
        [rect.center_top(), rect.center_bottom()],
        Stroke::new(1.0, theme.border),
    );
}
