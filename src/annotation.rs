use egui::{Color32, Vec2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];
pub const BLACK: Rgba = [0, 0, 0, 255];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tool {
    Rectangle,
    Arrow,
    Text,
    Mosaic,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Rectangle, Tool::Arrow, Tool::Text, Tool::Mosaic];

    pub fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "Rectangle",
            Self::Arrow => "Arrow",
            Self::Text => "Text",
            Self::Mosaic => "Mosaic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontSize(u8);

impl FontSize {
    pub const MIN: u8 = 8;
    pub const MAX: u8 = 72;
    pub const STEP: u8 = 2;
    pub const DEFAULT: Self = Self(20);

    pub fn from_points(points: u32) -> Self {
        Self(points.clamp(Self::MIN as u32, Self::MAX as u32) as u8)
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn points(self) -> f32 {
        self.0 as f32
    }

    pub fn larger(self) -> Self {
        Self::from_points(self.0 as u32 + Self::STEP as u32)
    }

    pub fn smaller(self) -> Self {
        Self::from_points((self.0 as u32).saturating_sub(Self::STEP as u32))
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Brush diameter of the mosaic tool, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MosaicSize(u32);

impl MosaicSize {
    pub const MIN: u32 = 5;
    pub const MAX: u32 = 100;
    pub const DEFAULT: Self = Self(40);

    pub fn from_px(px: u32) -> Self {
        Self(px.clamp(Self::MIN, Self::MAX))
    }

    pub fn px(self) -> u32 {
        self.0
    }
}

impl Default for MosaicSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Serialize for FontSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for FontSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Out-of-range values from hand-edited settings are clamped, not rejected.
        let raw = u32::deserialize(deserializer)?;
        Ok(Self::from_points(raw))
    }
}

impl Serialize for MosaicSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for MosaicSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u32::deserialize(deserializer)?;
        Ok(Self::from_px(raw))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Snaps to the pixel grid of the image buffer.
    pub fn to_pixel(self) -> Self {
        Self {
            x: self.x.floor(),
            y: self.y.floor(),
        }
    }

    pub fn delta(self, other: Point) -> Vec2 {
        Vec2::new(other.x - self.x, other.y - self.y)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RectData {
    pub min: Point,
    pub max: Point,
}

impl RectData {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self { min: a, max: b }.normalize()
    }

    pub fn normalize(self) -> Self {
        let min_x = self.min.x.min(self.max.x);
        let min_y = self.min.y.min(self.max.y);
        let max_x = self.min.x.max(self.max.x);
        let max_y = self.min.y.max(self.max.y);
        Self {
            min: Point { x: min_x, y: min_y },
            max: Point { x: max_x, y: max_y },
        }
    }

    pub fn width(self) -> f32 {
        (self.max.x - self.min.x).abs()
    }

    pub fn height(self) -> f32 {
        (self.max.y - self.min.y).abs()
    }
}

/// A committed annotation. Entries are immutable once appended to the log;
/// geometry is stored in image space.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum AnnotationOp {
    Rectangle {
        rect: RectData,
        color: Rgba,
    },
    Arrow {
        from: Point,
        to: Point,
        color: Rgba,
    },
    Text {
        pos: Point,
        text: String,
        color: Rgba,
        size: FontSize,
    },
    MosaicSmear {
        brush: MosaicSize,
        points: Vec<Point>,
    },
}

impl AnnotationOp {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rectangle { .. } => "rectangle",
            Self::Arrow { .. } => "arrow",
            Self::Text { .. } => "text",
            Self::MosaicSmear { .. } => "mosaic",
        }
    }
}

pub fn color32(color: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(color[0], color[1], color[2], color[3])
}

pub fn is_pure_white(color: Rgba) -> bool {
    color[..3] == WHITE[..3]
}

#[cfg(test)]
mod tests {
    use super::{AnnotationOp, FontSize, MosaicSize, Point, RectData};

    #[test]
    fn rect_from_corners_is_normalized() {
        let rect = RectData::from_corners(Point::new(300.0, 200.0), Point::new(100.0, 100.0));
        assert_eq!(rect.min, Point::new(100.0, 100.0));
        assert_eq!(rect.max, Point::new(300.0, 200.0));
        assert_eq!(rect.width(), 200.0);
        assert_eq!(rect.height(), 100.0);
    }

    #[test]
    fn point_snaps_to_pixel_grid() {
        assert_eq!(Point::new(10.7, -0.2).to_pixel(), Point::new(10.0, -1.0));
    }

    #[test]
    fn font_size_steps_stay_in_range() {
        assert_eq!(FontSize::from_points(200).as_u8(), FontSize::MAX);
        assert_eq!(FontSize::from_points(8).smaller().as_u8(), FontSize::MIN);
        assert_eq!(FontSize::DEFAULT.larger().as_u8(), 22);
    }

    #[test]
    fn sizes_deserialize_clamped() {
        let font: FontSize = serde_json::from_str("100").expect("font size");
        assert_eq!(font.as_u8(), FontSize::MAX);

        let mosaic: MosaicSize = serde_json::from_str("1").expect("mosaic size");
        assert_eq!(mosaic.px(), MosaicSize::MIN);
    }

    #[test]
    fn op_labels_name_the_tool() {
        let op = AnnotationOp::MosaicSmear {
            brush: MosaicSize::DEFAULT,
            points: vec![Point::new(1.0, 1.0)],
        };
        assert_eq!(op.label(), "mosaic");
        let arrow = AnnotationOp::Arrow {
            from: Point::new(0.0, 0.0),
            to: Point::new(5.0, 5.0),
            color: [0, 0, 0, 255],
        };
        assert_eq!(arrow.label(), "arrow");
    }
}
