use egui::{Pos2, Vec2};

use crate::config::EditorConfig;
use crate::mapper::CoordinateMapper;

/// Zoom and pan state of the editor canvas.
#[derive(Clone, Debug)]
pub struct Viewport {
    zoom: f32,
    offset: Vec2,
    image_size: Vec2,
    canvas_size: Option<Vec2>,
    min_zoom: f32,
    max_zoom: f32,
    zoom_in_factor: f32,
    zoom_out_factor: f32,
    fit_pending: bool,
}

impl Viewport {
    pub fn new(config: &EditorConfig, image_size: Vec2) -> Self {
        Self {
            zoom: 1.0_f32.clamp(config.min_zoom, config.max_zoom),
            offset: Vec2::ZERO,
            image_size,
            canvas_size: None,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_in_factor: config.zoom_in_factor,
            zoom_out_factor: config.zoom_out_factor,
            fit_pending: true,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn canvas_size(&self) -> Option<Vec2> {
        self.canvas_size
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.offset, self.zoom)
    }

    pub fn scaled_image_size(&self) -> Vec2 {
        self.image_size * self.zoom
    }

    /// Records the canvas size. The first known size fits the image to it.
    pub fn set_canvas_size(&mut self, size: Vec2) -> bool {
        if size.x <= 0.0 || size.y <= 0.0 || self.canvas_size == Some(size) {
            return false;
        }
        self.canvas_size = Some(size);
        if self.fit_pending {
            self.fit_to_canvas();
        } else {
            self.clamp_pan();
        }
        true
    }

    /// Steps the zoom by one factor keeping the image point under `pointer`
    /// in place. Rejected when the new zoom would leave the allowed range.
    pub fn zoom_at(&mut self, pointer: Pos2, zoom_in: bool) -> bool {
        let factor = if zoom_in {
            self.zoom_in_factor
        } else {
            self.zoom_out_factor
        };
        self.set_zoom_at(pointer, self.zoom * factor)
    }

    pub fn set_zoom_at(&mut self, pointer: Pos2, zoom: f32) -> bool {
        if !(self.min_zoom..=self.max_zoom).contains(&zoom) {
            return false;
        }
        let anchor = self.mapper().to_image(pointer);
        self.zoom = zoom;
        self.offset = pointer.to_vec2() - Vec2::new(anchor.x, anchor.y) * zoom;
        self.clamp_pan();
        true
    }

    pub fn pan_by(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::ZERO {
            return false;
        }
        let before = self.offset;
        self.offset += delta;
        self.clamp_pan();
        self.offset != before
    }

    /// Largest zoom not above 1.0 that shows the whole image, centred.
    pub fn fit_to_canvas(&mut self) {
        let Some(canvas) = self.canvas_size else {
            self.fit_pending = true;
            return;
        };
        self.fit_pending = false;
        if self.image_size.x <= 0.0 || self.image_size.y <= 0.0 {
            return;
        }
        let fit = (canvas.x / self.image_size.x)
            .min(canvas.y / self.image_size.y)
            .min(1.0);
        self.zoom = fit.clamp(self.min_zoom, self.max_zoom);
        self.offset = (canvas - self.scaled_image_size()) * 0.5;
        self.clamp_pan();
    }

    fn clamp_pan(&mut self) {
        let Some(canvas) = self.canvas_size else {
            return;
        };
        let scaled = self.scaled_image_size();
        self.offset.x = clamp_axis(self.offset.x, canvas.x, scaled.x);
        self.offset.y = clamp_axis(self.offset.y, canvas.y, scaled.y);
    }
}

fn clamp_axis(offset: f32, canvas: f32, scaled: f32) -> f32 {
    let slack = canvas - scaled;
    if slack < 0.0 {
        offset.clamp(slack, 0.0)
    } else {
        offset.clamp(0.0, slack)
    }
}

#[cfg(test)]
mod tests {
    use egui::{Pos2, Vec2};

    use super::Viewport;
    use crate::config::EditorConfig;

    fn viewport(image: Vec2, canvas: Option<Vec2>) -> Viewport {
        let mut viewport = Viewport::new(&EditorConfig::default(), image);
        if let Some(canvas) = canvas {
            viewport.set_canvas_size(canvas);
        }
        viewport
    }

    #[test]
    fn zoom_in_stops_at_upper_bound() {
        let mut viewport = viewport(Vec2::new(800.0, 600.0), None);
        let pointer = Pos2::new(10.0, 10.0);
        while viewport.zoom_at(pointer, true) {}

        let reached = viewport.zoom();
        assert!(reached <= 3.0 && reached * 1.1 > 3.0);
        for _ in 0..10 {
            assert!(!viewport.zoom_at(pointer, true));
            assert_eq!(viewport.zoom(), reached);
        }
    }

    #[test]
    fn zoom_out_stops_at_lower_bound() {
        let mut viewport = viewport(Vec2::new(800.0, 600.0), None);
        while viewport.zoom_at(Pos2::ZERO, false) {}
        assert!(viewport.zoom() >= 0.2 && viewport.zoom() * 0.9 < 0.2);
    }

    #[test]
    fn zoom_keeps_point_under_pointer() {
        let mut viewport = viewport(Vec2::new(800.0, 600.0), Some(Vec2::new(800.0, 600.0)));
        let pointer = Pos2::new(400.0, 300.0);
        assert!(viewport.set_zoom_at(pointer, 2.0));
        assert_eq!(viewport.zoom(), 2.0);

        let before = viewport.mapper().to_image(pointer);
        assert!(viewport.zoom_at(pointer, true));
        let after = viewport.mapper().to_canvas(before);

        assert!((after.x - pointer.x).abs() <= 1.0, "{after:?}");
        assert!((after.y - pointer.y).abs() <= 1.0, "{after:?}");
    }

    #[test]
    fn pan_is_clamped_to_image_edges() {
        let mut viewport = viewport(Vec2::new(800.0, 600.0), Some(Vec2::new(400.0, 300.0)));
        viewport.set_zoom_at(Pos2::ZERO, 1.0);

        viewport.pan_by(Vec2::new(500.0, 500.0));
        assert_eq!(viewport.offset(), Vec2::ZERO);

        viewport.pan_by(Vec2::new(-5000.0, -5000.0));
        assert_eq!(viewport.offset(), Vec2::new(-400.0, -300.0));
    }

    #[test]
    fn small_image_stays_inside_canvas() {
        let mut viewport = viewport(Vec2::new(100.0, 50.0), Some(Vec2::new(400.0, 300.0)));
        assert_eq!(viewport.zoom(), 1.0);
        assert_eq!(viewport.offset(), Vec2::new(150.0, 125.0));

        viewport.pan_by(Vec2::new(1000.0, -1000.0));
        assert_eq!(viewport.offset(), Vec2::new(300.0, 0.0));
    }

    #[test]
    fn first_canvas_size_fits_large_image() {
        let viewport = viewport(Vec2::new(1600.0, 1200.0), Some(Vec2::new(800.0, 600.0)));
        assert_eq!(viewport.zoom(), 0.5);
        assert_eq!(viewport.offset(), Vec2::ZERO);
    }

    #[test]
    fn pan_without_canvas_is_unclamped() {
        let mut viewport = viewport(Vec2::new(100.0, 100.0), None);
        assert!(viewport.pan_by(Vec2::new(-900.0, 40.0)));
        assert_eq!(viewport.offset(), Vec2::new(-900.0, 40.0));
    }
}
