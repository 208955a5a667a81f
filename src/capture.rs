use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use egui::{Pos2, Rect};
use image::RgbaImage;
use xcap::Monitor;

/// Pixel rectangle on the captured screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionBounds {
    pub fn from_corners(a: Pos2, b: Pos2) -> Self {
        let min_x = a.x.min(b.x).max(0.0);
        let min_y = a.y.min(b.y).max(0.0);
        let max_x = a.x.max(b.x).max(0.0);
        let max_y = a.y.max(b.y).max(0.0);
        Self {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        }
    }
}

pub trait CaptureProvider {
    fn capture_full_screen(&mut self) -> Option<RgbaImage>;

    fn capture_region(&mut self, bounds: RegionBounds) -> Option<RgbaImage> {
        let full = self.capture_full_screen()?;
        crop_region(&full, bounds)
    }
}

/// Window hosting the app; hidden while the screen is grabbed.
pub trait HostWindow {
    fn minimize(&self);
    fn restore(&self);
}

pub struct ViewportHost<'a>(pub &'a egui::Context);

impl HostWindow for ViewportHost<'_> {
    fn minimize(&self) {
        self.0
            .send_viewport_cmd(egui::ViewportCommand::Minimized(true));
    }

    fn restore(&self) {
        self.0
            .send_viewport_cmd(egui::ViewportCommand::Minimized(false));
        self.0.send_viewport_cmd(egui::ViewportCommand::Focus);
    }
}

/// Grabs the first monitor through xcap.
#[derive(Default)]
pub struct ScreenCapture;

impl CaptureProvider for ScreenCapture {
    fn capture_full_screen(&mut self) -> Option<RgbaImage> {
        match grab_monitor() {
            Ok(image) => {
                log::info!("captured screen {}x{}", image.width(), image.height());
                Some(image)
            }
            Err(err) => {
                log::warn!("screen capture failed: {err:#}");
                None
            }
        }
    }
}

fn grab_monitor() -> Result<RgbaImage> {
    let monitors = Monitor::all().context("cannot enumerate monitors")?;
    let monitor = monitors.into_iter().next().context("no monitor found")?;
    let shot = monitor.capture_image().context("cannot capture monitor")?;
    let (width, height) = (shot.width(), shot.height());
    RgbaImage::from_raw(width, height, shot.into_raw()).context("unexpected capture buffer size")
}

pub fn crop_region(image: &RgbaImage, bounds: RegionBounds) -> Option<RgbaImage> {
    let x = bounds.x.min(image.width());
    let y = bounds.y.min(image.height());
    let width = bounds.width.min(image.width() - x);
    let height = bounds.height.min(image.height() - y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureMode {
    FullScreen,
    Region,
}

/// A capture waiting for the host window to get out of the way.
#[derive(Clone, Copy, Debug)]
pub struct PendingCapture {
    pub mode: CaptureMode,
    requested_at: Instant,
    delay: Duration,
}

impl PendingCapture {
    pub fn new(mode: CaptureMode, delay: Duration, now: Instant) -> Self {
        Self {
            mode,
            requested_at: now,
            delay,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.requested_at) >= self.delay
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.delay
            .saturating_sub(now.saturating_duration_since(self.requested_at))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    Pending,
    Selected(RegionBounds),
    TooSmall,
    Cancelled,
}

/// Drag-to-select state over a full-screen capture, in image pixels.
#[derive(Clone, Debug)]
pub struct RegionSelection {
    min_size: u32,
    anchor: Option<Pos2>,
    current: Option<Pos2>,
}

impl RegionSelection {
    pub fn new(min_size: u32) -> Self {
        Self {
            min_size,
            anchor: None,
            current: None,
        }
    }

    pub fn press(&mut self, pos: Pos2) {
        self.anchor = Some(pos);
        self.current = Some(pos);
    }

    pub fn drag(&mut self, pos: Pos2) {
        if self.anchor.is_some() {
            self.current = Some(pos);
        }
    }

    /// Both sides must exceed the minimum size; otherwise the drag is reset
    /// and the user picks again.
    pub fn release(&mut self, pos: Pos2) -> SelectionOutcome {
        let Some(anchor) = self.anchor.take() else {
            return SelectionOutcome::Pending;
        };
        self.current = None;

        let bounds = RegionBounds::from_corners(anchor, pos);
        if bounds.width > self.min_size && bounds.height > self.min_size {
            SelectionOutcome::Selected(bounds)
        } else {
            SelectionOutcome::TooSmall
        }
    }

    pub fn cancel(&mut self) -> SelectionOutcome {
        self.anchor = None;
        self.current = None;
        SelectionOutcome::Cancelled
    }

    pub fn current_rect(&self) -> Option<Rect> {
        Some(Rect::from_two_pos(self.anchor?, self.current?))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use egui::Pos2;
    use image::{Rgba, RgbaImage};

    use super::{
        crop_region, CaptureMode, CaptureProvider, PendingCapture, RegionBounds, RegionSelection,
        SelectionOutcome,
    };

    struct FixedScreen(RgbaImage);

    impl CaptureProvider for FixedScreen {
        fn capture_full_screen(&mut self) -> Option<RgbaImage> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn region_capture_crops_full_screen() {
        let screen = RgbaImage::from_fn(100, 80, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let mut provider = FixedScreen(screen);
        let region = provider
            .capture_region(RegionBounds {
                x: 10,
                y: 20,
                width: 30,
                height: 15,
            })
            .expect("region");
        assert_eq!(region.dimensions(), (30, 15));
        assert_eq!(*region.get_pixel(0, 0), Rgba([10, 20, 0, 255]));
    }

    #[test]
    fn crop_is_clipped_to_image() {
        let image = RgbaImage::new(50, 50);
        let clipped = crop_region(
            &image,
            RegionBounds {
                x: 40,
                y: 45,
                width: 30,
                height: 30,
            },
        )
        .expect("clipped region");
        assert_eq!(clipped.dimensions(), (10, 5));

        let outside = RegionBounds {
            x: 60,
            y: 0,
            width: 5,
            height: 5,
        };
        assert!(crop_region(&image, outside).is_none());
    }

    #[test]
    fn selection_accepts_large_drag() {
        let mut selection = RegionSelection::new(10);
        selection.press(Pos2::new(200.0, 150.0));
        selection.drag(Pos2::new(120.0, 90.0));
        assert!(selection.current_rect().is_some());

        let outcome = selection.release(Pos2::new(100.0, 80.0));
        assert_eq!(
            outcome,
            SelectionOutcome::Selected(RegionBounds {
                x: 100,
                y: 80,
                width: 100,
                height: 70,
            })
        );
        assert!(selection.current_rect().is_none());
    }

    #[test]
    fn selection_rejects_small_drag() {
        let mut selection = RegionSelection::new(10);
        selection.press(Pos2::new(10.0, 10.0));
        assert_eq!(selection.release(Pos2::new(20.0, 40.0)), SelectionOutcome::TooSmall);

        selection.press(Pos2::new(10.0, 10.0));
        assert!(matches!(
            selection.release(Pos2::new(21.0, 21.0)),
            SelectionOutcome::Selected(_)
        ));
    }

    #[test]
    fn selection_release_without_press_is_pending() {
        let mut selection = RegionSelection::new(10);
        assert_eq!(selection.release(Pos2::new(5.0, 5.0)), SelectionOutcome::Pending);
        assert_eq!(selection.cancel(), SelectionOutcome::Cancelled);
    }

    #[test]
    fn pending_capture_waits_for_delay() {
        let start = Instant::now();
        let pending = PendingCapture::new(CaptureMode::Region, Duration::from_millis(1000), start);
        assert!(!pending.is_due(start + Duration::from_millis(999)));
        assert!(pending.is_due(start + Duration::from_millis(1000)));
        assert_eq!(
            pending.remaining(start + Duration::from_millis(400)),
            Duration::from_millis(600)
        );
    }
}
