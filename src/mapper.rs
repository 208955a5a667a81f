use egui::{Pos2, Vec2};

use crate::annotation::Point;

/// Canvas <-> image transform for one zoom/pan state. Build a fresh one from
/// the viewport for every query; the offset moves whenever the zoom does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    offset: Vec2,
    zoom: f32,
}

impl CoordinateMapper {
    pub fn new(offset: Vec2, zoom: f32) -> Self {
        debug_assert!(zoom > 0.0);
        Self { offset, zoom }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn to_image(&self, canvas: Pos2) -> Point {
        Point::new(
            (canvas.x - self.offset.x) / self.zoom,
            (canvas.y - self.offset.y) / self.zoom,
        )
    }

    pub fn to_canvas(&self, image: Point) -> Pos2 {
        Pos2::new(
            image.x * self.zoom + self.offset.x,
            image.y * self.zoom + self.offset.y,
        )
    }

    pub fn scale_len(&self, image_len: f32) -> f32 {
        image_len * self.zoom
    }
}
