use egui::{
    vec2, Align2, Color32, ColorImage, Context, FontId, Id, Key, Painter, PointerButton, Pos2, Rect,
    Sense, Stroke, TextureHandle, TextureId, TextureOptions, Ui, Vec2,
};
use image::RgbaImage;

use crate::annotation::{color32, is_pure_white, Point, RectData, Rgba, Tool};
use crate::capture::{RegionSelection, SelectionOutcome};
use crate::compositor::StrokeStyle;
use crate::mapper::CoordinateMapper;
use crate::session::{EditorEvent, EditorSession, Gesture};
use crate::theme::ThemeColors;

/// GPU copy of the session buffer, re-uploaded when the revision moves.
#[derive(Default)]
pub struct CanvasTexture {
    handle: Option<TextureHandle>,
    revision: Option<u64>,
}

impl CanvasTexture {
    pub fn sync(&mut self, ctx: &Context, session: &EditorSession) -> TextureId {
        let revision = session.revision();
        match &mut self.handle {
            Some(handle) if self.revision == Some(revision) => handle.id(),
            Some(handle) => {
                handle.set(to_color_image(session.buffer()), TextureOptions::LINEAR);
                self.revision = Some(revision);
                handle.id()
            }
            None => {
                let handle = ctx.load_texture(
                    "tracemark_canvas",
                    to_color_image(session.buffer()),
                    TextureOptions::LINEAR,
                );
                let id = handle.id();
                self.handle = Some(handle);
                self.revision = Some(revision);
                id
            }
        }
    }
}

pub fn to_color_image(image: &RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [image.width() as usize, image.height() as usize],
        image.as_raw(),
    )
}

pub fn show_canvas(
    ui: &mut Ui,
    session: &EditorSession,
    texture_id: TextureId,
    theme: &ThemeColors,
    events: &mut Vec<EditorEvent>,
) {
    let (canvas_rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    events.push(EditorEvent::CanvasResized(canvas_rect.size()));

    let viewport = session.viewport();
    let mapper = viewport.mapper();
    let image_rect = Rect::from_min_size(canvas_rect.min + mapper.offset(), viewport.scaled_image_size());

    let painter = ui.painter_at(canvas_rect);
    painter.rect_filled(canvas_rect, 0.0, theme.canvas_bg);
    painter.rect_stroke(image_rect.expand(1.0), 0.0, Stroke::new(1.0, theme.border));
    painter.image(
        texture_id,
        image_rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    let overlay = Overlay {
        painter: &painter,
        origin: canvas_rect.min.to_vec2(),
        mapper,
        style: session.compositor().style(),
    };
    overlay.draw_gesture(session.gesture(), session.tools().color);
    if session.tools().tool == Tool::Mosaic {
        if let Some(hover) = session.hover() {
            let radius = mapper.scale_len(session.tools().mosaic_size.px() as f32 * 0.5);
            painter.circle_stroke(canvas_rect.min + hover.to_vec2(), radius, Stroke::new(1.5, theme.primary));
        }
    }

    collect_pointer_events(ui.ctx(), &response, canvas_rect, events);
    if let Gesture::TextEditing { anchor, buffer } = session.gesture() {
        let screen = canvas_rect.min + mapper.to_canvas(*anchor).to_vec2();
        let font_points = session.tools().font_size.points() * mapper.zoom();
        show_text_editor(ui.ctx(), screen, buffer, session.tools().color, font_points, theme, events);
    }
}

fn collect_pointer_events(ctx: &Context, response: &egui::Response, canvas_rect: Rect, events: &mut Vec<EditorEvent>) {
    let local = |pos: Pos2| Pos2::new(pos.x - canvas_rect.min.x, pos.y - canvas_rect.min.y);

    events.push(EditorEvent::Hover(response.hover_pos().map(local)));

    ctx.input(|input| {
        let pointer = &input.pointer;
        let Some(pos) = pointer.latest_pos() else {
            return;
        };

        if response.hovered() && pointer.button_pressed(PointerButton::Primary) {
            events.push(EditorEvent::PointerDown(local(pos)));
        } else if pointer.primary_down() && pointer.delta() != Vec2::ZERO {
            events.push(EditorEvent::PointerMove(local(pos)));
        }
        if pointer.button_released(PointerButton::Primary) {
            events.push(EditorEvent::PointerUp(local(pos)));
        }

        let panning = pointer.button_down(PointerButton::Middle) || pointer.button_down(PointerButton::Secondary);
        if panning && pointer.delta() != Vec2::ZERO {
            events.push(EditorEvent::Pan(pointer.delta()));
        }

        let scroll = input.raw_scroll_delta.y;
        if response.hovered() && scroll != 0.0 {
            events.push(EditorEvent::Scroll {
                pointer: local(pos),
                zoom_in: scroll > 0.0,
            });
        }
    });
}

/// Screen-space rendering of the in-progress gesture only. Committed
/// rectangles, arrows and text are not redrawn as vectors: they are burned
/// into the session buffer, and the buffer texture shows them at the current
/// zoom.
struct Overlay<'a> {
    painter: &'a Painter,
    origin: Vec2,
    mapper: CoordinateMapper,
    style: &'a StrokeStyle,
}

impl Overlay<'_> {
    fn to_screen(&self, point: Point) -> Pos2 {
        self.mapper.to_canvas(point) + self.origin
    }

    fn width(&self, px: u32) -> f32 {
        self.mapper.scale_len(px as f32).max(1.0)
    }

    fn draw_gesture(&self, gesture: &Gesture, color: Rgba) {
        let Gesture::Drawing { tool, start, current } = gesture else {
            return;
        };
        let preview = color32(color).linear_multiply(0.8);
        match tool {
            Tool::Rectangle => {
                let rect = RectData::from_corners(*start, *current);
                let screen = Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max));
                if is_pure_white(color) {
                    self.painter.rect_stroke(
                        screen.expand(self.mapper.scale_len(1.0)),
                        0.0,
                        Stroke::new(self.width(self.style.stroke_width), Color32::BLACK),
                    );
                }
                self.painter
                    .rect_stroke(screen, 0.0, Stroke::new(self.width(self.style.stroke_width), preview));
            }
            Tool::Arrow => {
                if is_pure_white(color) {
                    self.draw_arrow(*start, *current, Stroke::new(self.width(self.style.arrow_outline_width), Color32::BLACK));
                }
                self.draw_arrow(*start, *current, Stroke::new(self.width(self.style.stroke_width), preview));
            }
            Tool::Text | Tool::Mosaic => {}
        }
    }

    fn draw_arrow(&self, from: Point, to: Point, stroke: Stroke) {
        let (left, right) = self.style.arrow_head(from, to);
        let [from, to, left, right] = [from, to, left, right].map(|point| self.to_screen(point));
        for segment in [[from, to], [to, left], [to, right], [left, right]] {
            self.painter.line_segment(segment, stroke);
        }
    }
}

fn show_text_editor(
    ctx: &Context,
    screen_pos: Pos2,
    buffer: &str,
    color: Rgba,
    font_points: f32,
    theme: &ThemeColors,
    events: &mut Vec<EditorEvent>,
) {
    let mut text = buffer.to_string();
    let popup_id = Id::new("tracemark_text_edit");

    egui::Area::new(popup_id)
        .order(egui::Order::Foreground)
        .fixed_pos(screen_pos)
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(theme.card)
                .stroke(Stroke::new(1.0, theme.primary))
                .rounding(egui::Rounding::same(4.0))
                .inner_margin(egui::Margin::symmetric(6.0, 4.0))
                .show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut text)
                            .font(FontId::proportional(font_points.clamp(8.0, 96.0)))
                            .text_color(color32(color))
                            .desired_width(240.0)
                            .hint_text("Type, Enter to place, Esc to cancel")
                            .frame(false),
                    );
                    if !response.has_focus() && !response.lost_focus() {
                        response.request_focus();
                    }

                    if text != buffer {
                        events.push(EditorEvent::TextChanged(text.clone()));
                    }
                    if ui.input(|input| input.key_pressed(Key::Escape)) {
                        events.push(EditorEvent::CancelText);
                    } else if response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter)) {
                        events.push(EditorEvent::CommitText);
                    }
                });
        });
}

/// Full-window region picker drawn over a fresh screen capture.
pub fn show_region_selector(
    ui: &mut Ui,
    texture_id: TextureId,
    image_size: Vec2,
    selection: &mut RegionSelection,
) -> SelectionOutcome {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let scale = (rect.width() / image_size.x).min(rect.height() / image_size.y).max(f32::EPSILON);
    let image_rect = Rect::from_center_size(rect.center(), image_size * scale);
    let to_image = |pos: Pos2| ((pos - image_rect.min) / scale).to_pos2();
    let to_screen = |pos: Pos2| image_rect.min + pos.to_vec2() * scale;

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, Color32::BLACK);
    painter.image(
        texture_id,
        image_rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );
    painter.rect_filled(image_rect, 0.0, Color32::from_black_alpha(90));
    painter.text(
        Pos2::new(rect.center().x, rect.top() + 30.0),
        Align2::CENTER_CENTER,
        "Drag to select a region, Esc to cancel",
        FontId::proportional(18.0),
        Color32::WHITE,
    );

    if let Some(selected) = selection.current_rect() {
        let screen = Rect::from_min_max(to_screen(selected.min), to_screen(selected.max));
        painter.rect_stroke(screen, 0.0, Stroke::new(2.0, Color32::from_rgb(0x34, 0x98, 0xDB)));
        painter.text(
            screen.center_top() - vec2(0.0, 10.0),
            Align2::CENTER_BOTTOM,
            format!("{:.0} x {:.0}", selected.width(), selected.height()),
            FontId::proportional(13.0),
            Color32::WHITE,
        );
    }

    if ui.input(|input| input.key_pressed(Key::Escape)) {
        return selection.cancel();
    }
    if response.drag_started_by(PointerButton::Primary) {
        if let Some(origin) = ui.input(|input| input.pointer.press_origin()) {
            selection.press(to_image(origin));
        }
    }
    let Some(pos) = response.interact_pointer_pos() else {
        return SelectionOutcome::Pending;
    };
    if response.dragged_by(PointerButton::Primary) {
        selection.drag(to_image(pos));
    }
    if response.drag_stopped() {
        return selection.release(to_image(pos));
    }
    SelectionOutcome::Pending
}
