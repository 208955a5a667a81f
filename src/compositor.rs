use anyhow::{anyhow, Result};
use image::{Rgba as Pixel, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect as PixelRect;
use tiny_skia::{ColorU8, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Stroke, Transform};

use crate::annotation::{is_pure_white, AnnotationOp, FontSize, MosaicSize, Point, RectData, Rgba, BLACK};
use crate::config::EditorConfig;
use crate::fonts::FontResolver;

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub stroke_width: u32,
    pub arrow_outline_width: u32,
    pub arrow_head_length: f32,
    pub arrow_head_angle: f32,
    pub highlight_threshold: u32,
    pub highlight_alpha: u8,
    pub min_mosaic_block: u32,
}

impl StrokeStyle {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            stroke_width: config.stroke_width,
            arrow_outline_width: config.arrow_outline_width,
            arrow_head_length: config.arrow_head_length,
            arrow_head_angle: config.arrow_head_angle_deg.to_radians(),
            highlight_threshold: config.highlight_threshold,
            highlight_alpha: config.highlight_alpha,
            min_mosaic_block: config.min_mosaic_block,
        }
    }

    /// End points of the two head rays for an arrow pointing at `to`.
    pub fn arrow_head(&self, from: Point, to: Point) -> (Point, Point) {
        let angle = (to.y - from.y).atan2(to.x - from.x);
        let len = self.arrow_head_length;
        let left = Point::new(
            to.x - len * (angle + self.arrow_head_angle).cos(),
            to.y - len * (angle + self.arrow_head_angle).sin(),
        );
        let right = Point::new(
            to.x - len * (angle - self.arrow_head_angle).cos(),
            to.y - len * (angle - self.arrow_head_angle).sin(),
        );
        (left, right)
    }

    pub fn is_highlight(&self, rect: RectData) -> bool {
        let threshold = self.highlight_threshold as f32;
        rect.width() > threshold && rect.height() > threshold
    }

    pub fn mosaic_block(&self, brush: u32, region_w: u32, region_h: u32) -> u32 {
        brush.min(region_w.min(region_h)).max(self.min_mosaic_block)
    }
}

/// Burns annotation ops into a raster buffer.
pub struct Compositor {
    style: StrokeStyle,
    fonts: FontResolver,
}

impl Compositor {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            style: StrokeStyle::from_config(config),
            fonts: FontResolver::new(&config.font_candidates),
        }
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn apply(&self, buffer: &mut RgbaImage, op: &AnnotationOp) -> Result<()> {
        match op {
            AnnotationOp::Rectangle { rect, color } => {
                self.draw_rectangle(buffer, *rect, *color);
                Ok(())
            }
            AnnotationOp::Arrow { from, to, color } => self.draw_arrow(buffer, *from, *to, *color),
            AnnotationOp::Text {
                pos,
                text,
                color,
                size,
            } => {
                self.draw_text(buffer, *pos, text, *color, *size);
                Ok(())
            }
            AnnotationOp::MosaicSmear { brush, points } => {
                for point in points {
                    self.mosaic_dab(buffer, *point, *brush);
                }
                Ok(())
            }
        }
    }

    /// Copies `base` and re-applies `ops` in order.
    pub fn replay(&self, base: &RgbaImage, ops: &[AnnotationOp]) -> RgbaImage {
        let mut buffer = base.clone();
        for op in ops {
            if let Err(err) = self.apply(&mut buffer, op) {
                log::warn!("cannot replay {} annotation: {err:#}", op.label());
            }
        }
        buffer
    }

    fn draw_rectangle(&self, buffer: &mut RgbaImage, rect: RectData, color: Rgba) {
        let rect = rect.normalize();
        let (x0, y0) = (rect.min.x as i64, rect.min.y as i64);
        let (x1, y1) = (rect.max.x as i64, rect.max.y as i64);
        let width = self.style.stroke_width as i64;

        if is_pure_white(color) {
            stroke_rect(buffer, x0 - 1, y0 - 1, x1 + 1, y1 + 1, width, BLACK);
        }
        stroke_rect(buffer, x0, y0, x1, y1, width, color);

        if self.style.is_highlight(rect) {
            let fill = [color[0], color[1], color[2], self.style.highlight_alpha];
            blend_rect(buffer, x0 + width, y0 + width, x1 - width, y1 - width, fill);
        }
    }

    fn draw_arrow(&self, buffer: &mut RgbaImage, from: Point, to: Point, color: Rgba) -> Result<()> {
        let (left, right) = self.style.arrow_head(from, to);
        let segments = [(from, to), (to, left), (to, right), (left, right)];

        if is_pure_white(color) {
            stroke_segments(buffer, &segments, BLACK, self.style.arrow_outline_width as f32)?;
        }
        stroke_segments(buffer, &segments, color, self.style.stroke_width as f32)
    }

    fn draw_text(&self, buffer: &mut RgbaImage, pos: Point, text: &str, color: Rgba, size: FontSize) {
        let Some(font) = self.fonts.font() else {
            return;
        };
        draw_text_mut(
            buffer,
            Pixel(color),
            pos.x as i32,
            pos.y as i32,
            size.points(),
            font,
            text,
        );
    }

    /// One brush application: every block under the brush window is replaced
    /// by its mean colour.
    pub fn mosaic_dab(&self, buffer: &mut RgbaImage, center: Point, brush: MosaicSize) {
        let half = (brush.px() / 2) as i64;
        let cx = center.x.floor() as i64;
        let cy = center.y.floor() as i64;
        let x0 = (cx - half).max(0);
        let y0 = (cy - half).max(0);
        let x1 = (cx + half).min(buffer.width() as i64);
        let y1 = (cy + half).min(buffer.height() as i64);
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        let block = self
            .style
            .mosaic_block(brush.px(), (x1 - x0) as u32, (y1 - y0) as u32) as i64;

        let mut by = y0;
        while by < y1 {
            let block_end_y = (by + block).min(y1);
            let mut bx = x0;
            while bx < x1 {
                let block_end_x = (bx + block).min(x1);
                let average = block_average(buffer, bx, by, block_end_x, block_end_y);
                for y in by..block_end_y {
                    for x in bx..block_end_x {
                        buffer.put_pixel(x as u32, y as u32, average);
                    }
                }
                bx = block_end_x;
            }
            by = block_end_y;
        }
    }
}

/// Mean colour over the half-open block `[x0, x1) x [y0, y1)`, rounded.
fn block_average(buffer: &RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64) -> Pixel<u8> {
    let mut sums = [0u64; 4];
    let mut count = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = buffer.get_pixel(x as u32, y as u32);
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += channel as u64;
            }
            count += 1;
        }
    }
    if count == 0 {
        return Pixel([0, 0, 0, 0]);
    }
    Pixel(sums.map(|sum| ((sum + count / 2) / count) as u8))
}

/// Clips the inclusive rectangle to the buffer; `None` when nothing is left.
fn clip_inclusive(buffer: &RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64) -> Option<(u32, u32, u32, u32)> {
    let max_x = buffer.width() as i64 - 1;
    let max_y = buffer.height() as i64 - 1;
    let (x0, y0) = (x0.max(0), y0.max(0));
    let (x1, y1) = (x1.min(max_x), y1.min(max_y));
    if x1 < x0 || y1 < y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn fill_rect(buffer: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba) {
    let Some((x0, y0, x1, y1)) = clip_inclusive(buffer, x0, y0, x1, y1) else {
        return;
    };
    let rect = PixelRect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1);
    draw_filled_rect_mut(buffer, rect, Pixel(color));
}

/// Outline drawn inward from the inclusive bounds, `width` pixels thick.
fn stroke_rect(buffer: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, width: i64, color: Rgba) {
    let inner = width - 1;
    fill_rect(buffer, x0, y0, x1, (y0 + inner).min(y1), color);
    fill_rect(buffer, x0, (y1 - inner).max(y0), x1, y1, color);
    fill_rect(buffer, x0, y0, (x0 + inner).min(x1), y1, color);
    fill_rect(buffer, (x1 - inner).max(x0), y0, x1, y1, color);
}

/// Source-over composite of a translucent colour onto the inclusive rectangle.
fn blend_rect(buffer: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba) {
    let Some((x0, y0, x1, y1)) = clip_inclusive(buffer, x0, y0, x1, y1) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let blended = blend_over(color, buffer.get_pixel(x, y).0);
            buffer.put_pixel(x, y, Pixel(blended));
        }
    }
}

fn blend_over(src: Rgba, dst: Rgba) -> Rgba {
    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |s: u8, d: u8| {
        let value = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ]
}

/// Strokes line segments with tiny-skia on a pixmap covering only the
/// segments' bounding box.
fn stroke_segments(
    buffer: &mut RgbaImage,
    segments: &[(Point, Point)],
    color: Rgba,
    width: f32,
) -> Result<()> {
    let pad = width + 2.0;
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for (a, b) in segments {
        for p in [a, b] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
    }

    let left = ((min_x - pad).floor().max(0.0)) as u32;
    let top = ((min_y - pad).floor().max(0.0)) as u32;
    let right = ((max_x + pad).ceil().max(0.0) as u32).min(buffer.width());
    let bottom = ((max_y + pad).ceil().max(0.0) as u32).min(buffer.height());
    if right <= left || bottom <= top {
        return Ok(());
    }

    let mut pixmap = Pixmap::new(right - left, bottom - top)
        .ok_or_else(|| anyhow!("cannot allocate pixmap"))?;
    copy_region_to_pixmap(buffer, left, top, &mut pixmap);
    let before = pixmap.pixels().to_vec();

    let mut pb = PathBuilder::new();
    for (from, to) in segments {
        pb.move_to(from.x + 0.5, from.y + 0.5);
        pb.line_to(to.x + 0.5, to.y + 0.5);
    }
    let path = pb.finish().ok_or_else(|| anyhow!("cannot build stroke path"))?;

    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    let stroke = Stroke {
        width,
        ..Default::default()
    };
    let transform = Transform::from_translate(-(left as f32), -(top as f32));
    pixmap.stroke_path(&path, &paint, &stroke, transform, None);

    copy_pixmap_to_region(&pixmap, &before, buffer, left, top);
    Ok(())
}

fn copy_region_to_pixmap(buffer: &RgbaImage, left: u32, top: u32, pixmap: &mut Pixmap) {
    let width = pixmap.width();
    for (i, pixel) in pixmap.pixels_mut().iter_mut().enumerate() {
        let x = left + i as u32 % width;
        let y = top + i as u32 / width;
        let [r, g, b, a] = buffer.get_pixel(x, y).0;
        *pixel = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
}

/// Writes back only pixels the stroke touched; a premultiply round trip is
/// lossy for translucent pixels.
fn copy_pixmap_to_region(
    pixmap: &Pixmap,
    before: &[PremultipliedColorU8],
    buffer: &mut RgbaImage,
    left: u32,
    top: u32,
) {
    let width = pixmap.width();
    for (i, (pixel, old)) in pixmap.pixels().iter().zip(before).enumerate() {
        if pixel == old {
            continue;
        }
        let x = left + i as u32 % width;
        let y = top + i as u32 / width;
        let color = pixel.demultiply();
        buffer.put_pixel(
            x,
            y,
            Pixel([color.red(), color.green(), color.blue(), color.alpha()]),
        );
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{blend_over, Compositor};
    use crate::annotation::{AnnotationOp, FontSize, MosaicSize, Point, RectData, WHITE};
    use crate::config::EditorConfig;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn compositor() -> Compositor {
        Compositor::new(&EditorConfig::default())
    }

    fn rect_op(x0: f32, y0: f32, x1: f32, y1: f32, color: [u8; 4]) -> AnnotationOp {
        AnnotationOp::Rectangle {
            rect: RectData::from_corners(Point::new(x0, y0), Point::new(x1, y1)),
            color,
        }
    }

    #[test]
    fn mosaic_of_uniform_region_is_identity() {
        let color = Rgba([37, 120, 201, 255]);
        let mut buffer = RgbaImage::from_pixel(40, 40, color);
        compositor().mosaic_dab(&mut buffer, Point::new(20.0, 20.0), MosaicSize::from_px(40));
        assert!(buffer.pixels().all(|pixel| *pixel == color));
    }

    #[test]
    fn mosaic_block_takes_rounded_mean() {
        let mut buffer = RgbaImage::from_fn(6, 6, |x, _| {
            if x < 3 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        compositor().mosaic_dab(&mut buffer, Point::new(3.0, 3.0), MosaicSize::from_px(6));
        assert!(buffer.pixels().all(|pixel| *pixel == Rgba([128, 128, 128, 255])));
    }

    #[test]
    fn mosaic_block_never_drops_below_floor() {
        let compositor = compositor();
        assert_eq!(compositor.style().mosaic_block(5, 2, 2), 3);
        assert_eq!(compositor.style().mosaic_block(40, 40, 12), 12);

        let mut buffer = RgbaImage::from_pixel(8, 8, Rgba([10, 10, 10, 255]));
        compositor.mosaic_dab(&mut buffer, Point::new(0.0, 0.0), MosaicSize::from_px(5));
        compositor.mosaic_dab(&mut buffer, Point::new(-50.0, 400.0), MosaicSize::from_px(5));
        assert_eq!(*buffer.get_pixel(0, 0), Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn mosaic_only_touches_brush_window() {
        let mut buffer = RgbaImage::from_fn(60, 60, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, 0, 255]));
        let before = buffer.clone();
        compositor().mosaic_dab(&mut buffer, Point::new(30.0, 30.0), MosaicSize::from_px(10));

        assert_eq!(buffer.get_pixel(10, 10), before.get_pixel(10, 10));
        assert_eq!(buffer.get_pixel(35, 30), before.get_pixel(35, 30));
        assert_eq!(buffer.get_pixel(25, 25), buffer.get_pixel(34, 34));
        assert_ne!(buffer.get_pixel(25, 25), before.get_pixel(25, 25));
    }

    #[test]
    fn rectangle_outline_is_drawn_inward() {
        let gray = Rgba([128, 128, 128, 255]);
        let mut buffer = RgbaImage::from_pixel(20, 20, gray);
        compositor()
            .apply(&mut buffer, &rect_op(2.0, 2.0, 15.0, 15.0, RED))
            .expect("rectangle");

        assert_eq!(*buffer.get_pixel(2, 2), Rgba(RED));
        assert_eq!(*buffer.get_pixel(8, 5), Rgba(RED));
        assert_eq!(*buffer.get_pixel(15, 9), Rgba(RED));
        assert_eq!(*buffer.get_pixel(8, 6), gray);
        assert_eq!(*buffer.get_pixel(1, 1), gray);
        assert_eq!(*buffer.get_pixel(16, 16), gray);
    }

    #[test]
    fn white_rectangle_gets_black_border() {
        let gray = Rgba([128, 128, 128, 255]);
        let mut buffer = RgbaImage::from_pixel(20, 20, gray);
        compositor()
            .apply(&mut buffer, &rect_op(2.0, 2.0, 15.0, 15.0, WHITE))
            .expect("rectangle");

        assert_eq!(*buffer.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(*buffer.get_pixel(16, 8), Rgba([0, 0, 0, 255]));
        assert_eq!(*buffer.get_pixel(2, 2), Rgba(WHITE));
    }

    #[test]
    fn large_rectangle_is_highlighted() {
        let black = Rgba([0, 0, 0, 255]);
        let mut buffer = RgbaImage::from_pixel(200, 200, black);
        compositor()
            .apply(&mut buffer, &rect_op(10.0, 10.0, 150.0, 150.0, RED))
            .expect("rectangle");

        assert_eq!(*buffer.get_pixel(80, 80), Rgba([60, 0, 0, 255]));
        assert_eq!(*buffer.get_pixel(12, 80), Rgba(RED));
        assert_eq!(*buffer.get_pixel(160, 160), black);
    }

    #[test]
    fn rectangle_at_threshold_is_not_highlighted() {
        let black = Rgba([0, 0, 0, 255]);
        let mut buffer = RgbaImage::from_pixel(200, 200, black);
        compositor()
            .apply(&mut buffer, &rect_op(10.0, 10.0, 110.0, 150.0, RED))
            .expect("rectangle");
        assert_eq!(*buffer.get_pixel(60, 80), black);
    }

    #[test]
    fn blend_over_opaque_background() {
        assert_eq!(blend_over([255, 0, 0, 60], [0, 0, 0, 255]), [60, 0, 0, 255]);
        assert_eq!(blend_over([0, 0, 255, 0], [9, 9, 9, 255]), [9, 9, 9, 255]);
    }

    #[test]
    fn arrow_has_shaft_and_head() {
        let mut buffer = RgbaImage::from_pixel(100, 100, Rgba(WHITE));
        let op = AnnotationOp::Arrow {
            from: Point::new(10.0, 50.0),
            to: Point::new(90.0, 50.0),
            color: BLUE,
        };
        compositor().apply(&mut buffer, &op).expect("arrow");

        assert_eq!(*buffer.get_pixel(50, 50), Rgba(BLUE));
        assert_ne!(*buffer.get_pixel(81, 45), Rgba(WHITE));
        assert_ne!(*buffer.get_pixel(81, 55), Rgba(WHITE));
        assert_eq!(*buffer.get_pixel(50, 20), Rgba(WHITE));
    }

    #[test]
    fn arrow_leaves_untouched_translucent_pixels_exact() {
        let backdrop = Rgba([200, 100, 50, 77]);
        let mut buffer = RgbaImage::from_pixel(100, 100, backdrop);
        let op = AnnotationOp::Arrow {
            from: Point::new(10.0, 50.0),
            to: Point::new(90.0, 50.0),
            color: BLUE,
        };
        compositor().apply(&mut buffer, &op).expect("arrow");

        assert_eq!(*buffer.get_pixel(20, 36), backdrop);
        assert_eq!(*buffer.get_pixel(50, 64), backdrop);
        assert_ne!(*buffer.get_pixel(50, 50), backdrop);
    }

    #[test]
    fn arrow_head_points_at_end() {
        let style = compositor().style().clone();
        let (left, right) = style.arrow_head(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!(left.x < 100.0 && right.x < 100.0);
        assert!((left.x - (100.0 - 20.0 * 30f32.to_radians().cos())).abs() < 1e-3);
        assert!((left.y + 10.0).abs() < 1e-3);
        assert!((right.y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn white_arrow_gets_dark_outline() {
        let mut buffer = RgbaImage::from_pixel(100, 100, Rgba(WHITE));
        let op = AnnotationOp::Arrow {
            from: Point::new(10.0, 50.0),
            to: Point::new(90.0, 50.0),
            color: WHITE,
        };
        compositor().apply(&mut buffer, &op).expect("arrow");

        assert!(buffer.get_pixel(50, 48)[0] < 200);
        assert_eq!(*buffer.get_pixel(50, 50), Rgba(WHITE));
    }

    #[test]
    fn text_is_burned_into_buffer() {
        let mut buffer = RgbaImage::from_pixel(120, 40, Rgba(WHITE));
        let op = AnnotationOp::Text {
            pos: Point::new(4.0, 4.0),
            text: "Hi there".to_string(),
            color: [0, 0, 0, 255],
            size: FontSize::DEFAULT,
        };
        compositor().apply(&mut buffer, &op).expect("text");
        assert!(buffer.pixels().any(|pixel| pixel[0] < 128));
    }
}
