use egui::{vec2, Align, Align2, FontId, Layout, Pos2, Rect, RichText, Stroke, Ui};

use crate::annotation::{color32, FontSize, MosaicSize, Rgba, Tool};
use crate::session::{EditorEvent, ToolState};
use crate::theme::ThemeColors;
use crate::ui_controls;

pub const PALETTE: [Rgba; 8] = [
    [0xFF, 0x41, 0x36, 0xFF],
    [0x00, 0x74, 0xD9, 0xFF],
    [0x2E, 0xCC, 0x40, 0xFF],
    [0xFF, 0xDC, 0x00, 0xFF],
    [0xFF, 0x85, 0x1B, 0xFF],
    [0xF0, 0x12, 0xBE, 0xFF],
    [0xB1, 0x0D, 0xC9, 0xFF],
    [0xFF, 0xFF, 0xFF, 0xFF],
];

pub fn show_toolbar(ui: &mut Ui, tools: &ToolState, theme: &ThemeColors, events: &mut Vec<EditorEvent>) {
    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
        ui.spacing_mut().interact_size.y = theme.metrics.chip_h;
        ui.spacing_mut().item_spacing = vec2(theme.metrics.gap, 0.0);

        for tool in Tool::ALL {
            tool_button(ui, tools, theme, tool, events);
        }

        ui_controls::vertical_divider(ui, theme, theme.metrics.chip_h);
        for color in PALETTE {
            if ui_controls::color_chip(ui, theme, color32(color), tools.color == color)
                .on_hover_text("Choose color")
                .clicked()
            {
                events.push(EditorEvent::SetColor(color));
            }
        }
        custom_color_picker(ui, tools, events);

        match tools.tool {
            Tool::Text => {
                ui_controls::vertical_divider(ui, theme, theme.metrics.chip_h);
                font_size_stepper(ui, tools, theme, events);
            }
            Tool::Mosaic => {
                ui_controls::vertical_divider(ui, theme, theme.metrics.chip_h);
                mosaic_size_slider(ui, tools, theme, events);
            }
            Tool::Rectangle | Tool::Arrow => {}
        }
    });
}

fn tool_button(ui: &mut Ui, tools: &ToolState, theme: &ThemeColors, tool: Tool, events: &mut Vec<EditorEvent>) {
    let selected = tools.tool == tool;
    let hint = format!("{} ({})", tool.label(), shortcut_hint(tool));
    let response = ui_controls::tool_chip(ui, theme, "", selected).on_hover_text(hint);
    draw_tool_icon(ui, response.rect, tool, selected, theme);
    if response.clicked() {
        events.push(EditorEvent::SelectTool(tool));
    }
}

fn shortcut_hint(tool: Tool) -> &'static str {
    match tool {
        Tool::Rectangle => "R",
        Tool::Arrow => "A",
        Tool::Text => "T",
        Tool::Mosaic => "M",
    }
}

fn draw_tool_icon(ui: &Ui, rect: Rect, tool: Tool, selected: bool, theme: &ThemeColors) {
    let color = if selected { theme.primary } else { theme.text };
    let stroke = Stroke::new(1.65, color);
    let painter = ui.painter();
    let icon_rect = rect.shrink2(vec2(10.0, 6.0));

    match tool {
        Tool::Rectangle => {
            painter.rect_stroke(icon_rect.shrink2(vec2(1.0, 2.0)), 2.0, stroke);
        }
        Tool::Arrow => {
            let start = Pos2::new(icon_rect.left() + 1.0, icon_rect.bottom() - 1.0);
            let tip = Pos2::new(icon_rect.right() - 1.0, icon_rect.top() + 1.0);
            painter.line_segment([start, tip], stroke);
            painter.line_segment([tip, tip + vec2(-6.0, 0.0)], stroke);
            painter.line_segment([tip, tip + vec2(0.0, 6.0)], stroke);
        }
        Tool::Text => {
            painter.text(
                icon_rect.center(),
                Align2::CENTER_CENTER,
                "T",
                FontId::proportional(15.0),
                color,
            );
        }
        Tool::Mosaic => {
            let cell = icon_rect.height().min(icon_rect.width()) / 3.0;
            let origin = icon_rect.center() - vec2(cell * 1.5, cell * 1.5);
            for row in 0..3 {
                for col in 0..3 {
                    if (row + col) % 2 == 0 {
                        let min = origin + vec2(col as f32 * cell, row as f32 * cell);
                        painter.rect_filled(Rect::from_min_size(min, vec2(cell, cell)), 0.0, color);
                    }
                }
            }
        }
    }
}

fn custom_color_picker(ui: &mut Ui, tools: &ToolState, events: &mut Vec<EditorEvent>) {
    let mut rgb = [tools.color[0], tools.color[1], tools.color[2]];
    if ui
        .color_edit_button_srgb(&mut rgb)
        .on_hover_text("Custom color")
        .changed()
    {
        events.push(EditorEvent::SetColor([rgb[0], rgb[1], rgb[2], 0xFF]));
    }
}

fn font_size_stepper(ui: &mut Ui, tools: &ToolState, theme: &ThemeColors, events: &mut Vec<EditorEvent>) {
    ui_controls::muted_label(ui, theme, "Font size");
    let size = tools.font_size;
    let button = vec2(theme.metrics.chip_h, theme.metrics.chip_h);

    if ui
        .add_enabled(size.as_u8() > FontSize::MIN, egui::Button::new("−").min_size(button))
        .clicked()
    {
        events.push(EditorEvent::SetFontSize(size.smaller()));
    }
    ui.label(RichText::new(size.as_u8().to_string()).strong());
    if ui
        .add_enabled(size.as_u8() < FontSize::MAX, egui::Button::new("+").min_size(button))
        .clicked()
    {
        events.push(EditorEvent::SetFontSize(size.larger()));
    }
}

fn mosaic_size_slider(ui: &mut Ui, tools: &ToolState, theme: &ThemeColors, events: &mut Vec<EditorEvent>) {
    ui_controls::muted_label(ui, theme, "Mosaic size");
    let mut px = tools.mosaic_size.px();
    let response = ui.add(egui::Slider::new(&mut px, MosaicSize::MIN..=MosaicSize::MAX).suffix(" px"));
    if response.changed() {
        events.push(EditorEvent::SetMosaicSize(MosaicSize::from_px(px)));
    }
}

#[cfg(test)]
mod tests {
    use super::PALETTE;
    use crate::config::UserSettings;

    #[test]
    fn default_color_is_first_preset() {
        assert_eq!(PALETTE[0], UserSettings::default().last_color);
        assert!(PALETTE.iter().all(|color| color[3] == 0xFF));
    }
}
