use egui::epaint::Shadow;
use egui::{vec2, Color32, Context, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

/// Palette handed to every UI function; nothing reads theme state globally.
#[derive(Clone, Debug, PartialEq)]
pub struct ThemeColors {
    pub dark: bool,
    pub background: Color32,
    pub panel: Color32,
    pub card: Color32,
    pub canvas_bg: Color32,
    pub text: Color32,
    pub text_muted: Color32,
    pub primary: Color32,
    pub primary_soft: Color32,
    pub border: Color32,
    pub danger: Color32,
    pub metrics: Metrics,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Metrics {
    pub rounding: f32,
    pub chip_rounding: f32,
    pub chip_w: f32,
    pub chip_h: f32,
    pub icon_size: f32,
    pub action_height: f32,
    pub panel_padding_x: f32,
    pub panel_padding_y: f32,
    pub gap: f32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            rounding: 8.0,
            chip_rounding: 8.0,
            chip_w: 40.0,
            chip_h: 28.0,
            icon_size: 18.0,
            action_height: 28.0,
            panel_padding_x: 12.0,
            panel_padding_y: 8.0,
            gap: 8.0,
        }
    }
}

impl ThemeColors {
    pub fn light() -> Self {
        Self {
            dark: false,
            background: Color32::from_rgb(0xF5, 0xF5, 0xF7),
            panel: Color32::from_rgb(0xF5, 0xF5, 0xF7),
            card: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            canvas_bg: Color32::from_rgb(0xF9, 0xF9, 0xF9),
            text: Color32::from_rgb(0x34, 0x49, 0x5E),
            text_muted: Color32::from_rgb(0x7F, 0x8C, 0x8D),
            primary: Color32::from_rgb(0x34, 0x98, 0xDB),
            primary_soft: Color32::from_rgba_unmultiplied(0x34, 0x98, 0xDB, 60),
            border: Color32::from_rgb(0x99, 0x99, 0x99),
            danger: Color32::from_rgb(0xE7, 0x4C, 0x3C),
            metrics: Metrics::default(),
        }
    }

    pub fn dark() -> Self {
        Self {
            dark: true,
            background: Color32::from_rgb(0x1A, 0x1A, 0x2E),
            panel: Color32::from_rgb(0x25, 0x25, 0x40),
            card: Color32::from_rgb(0x2E, 0x2E, 0x4A),
            canvas_bg: Color32::from_rgb(0x2A, 0x2A, 0x42),
            text: Color32::from_rgb(0xEC, 0xF0, 0xF1),
            text_muted: Color32::from_rgb(0xA0, 0xA8, 0xB8),
            primary: Color32::from_rgb(0x34, 0x98, 0xDB),
            primary_soft: Color32::from_rgba_unmultiplied(0x34, 0x98, 0xDB, 80),
            border: Color32::from_rgb(0x66, 0x66, 0x66),
            danger: Color32::from_rgb(0xE7, 0x4C, 0x3C),
            metrics: Metrics::default(),
        }
    }

    pub fn for_mode(dark: bool) -> Self {
        if dark {
            Self::dark()
        } else {
            Self::light()
        }
    }
}

pub fn apply_theme(ctx: &Context, theme: &ThemeColors) {
    let mut style: Style = (*ctx.style()).clone();
    let metrics = &theme.metrics;

    style.spacing.item_spacing = vec2(metrics.gap, metrics.gap);
    style.spacing.button_padding = vec2(12.0, 6.0);
    style.spacing.window_margin = egui::Margin::symmetric(12.0, 12.0);

    style.visuals = if theme.dark {
        Visuals::dark()
    } else {
        Visuals::light()
    };
    style.visuals.override_text_color = Some(theme.text);
    style.visuals.panel_fill = theme.panel;
    style.visuals.window_fill = theme.panel;
    style.visuals.faint_bg_color = theme.background;
    style.visuals.extreme_bg_color = theme.card;
    style.visuals.window_rounding = Rounding::same(metrics.rounding);

    let widgets = &mut style.visuals.widgets;
    widgets.noninteractive.bg_stroke = Stroke::new(1.0, theme.border);
    widgets.inactive.bg_fill = theme.card;
    widgets.inactive.weak_bg_fill = theme.card;
    widgets.inactive.bg_stroke = Stroke::new(1.0, theme.border);
    widgets.hovered.bg_stroke = Stroke::new(1.0, theme.primary);
    widgets.active.bg_fill = theme.primary_soft;
    widgets.active.bg_stroke = Stroke::new(1.0, theme.primary);
    for visuals in [
        &mut widgets.noninteractive,
        &mut widgets.inactive,
        &mut widgets.hovered,
        &mut widgets.active,
        &mut widgets.open,
    ] {
        visuals.rounding = Rounding::same(metrics.rounding);
    }

    style.visuals.selection.bg_fill = theme.primary_soft;
    style.visuals.selection.stroke = Stroke::new(1.0, theme.primary);
    style.visuals.window_shadow = Shadow {
        offset: vec2(0.0, 8.0),
        blur: 20.0,
        spread: 0.0,
        color: Color32::from_black_alpha(if theme.dark { 110 } else { 40 }),
    };

    style.text_styles.insert(
        TextStyle::Heading,
        FontId::new(22.0, FontFamily::Proportional),
    );
    style
        .text_styles
        .insert(TextStyle::Body, FontId::new(15.0, FontFamily::Proportional));
    style.text_styles.insert(
        TextStyle::Button,
        FontId::new(14.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        TextStyle::Small,
        FontId::new(12.0, FontFamily::Proportional),
    );

    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::ThemeColors;

    #[test]
    fn mode_selects_palette() {
        assert!(ThemeColors::for_mode(true).dark);
        assert!(!ThemeColors::for_mode(false).dark);
        assert_ne!(
            ThemeColors::light().canvas_bg,
            ThemeColors::dark().canvas_bg
        );
        assert_eq!(ThemeColors::light().primary, ThemeColors::dark().primary);
    }
}
