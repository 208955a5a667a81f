use egui::{Pos2, Vec2};
use image::imageops::FilterType;
use image::RgbaImage;

use crate::annotation::{AnnotationOp, FontSize, MosaicSize, Point, RectData, Rgba, Tool};
use crate::compositor::Compositor;
use crate::config::{EditorConfig, UserSettings};
use crate::history::AnnotationLog;
use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolState {
    pub tool: Tool,
    pub color: Rgba,
    pub font_size: FontSize,
    pub mosaic_size: MosaicSize,
}

impl ToolState {
    pub fn from_settings(settings: &UserSettings) -> Self {
        Self {
            tool: settings.last_tool,
            color: settings.last_color,
            font_size: settings.last_font_size,
            mosaic_size: settings.last_mosaic_size,
        }
    }

    pub fn store_into(&self, settings: &mut UserSettings) {
        settings.last_tool = self.tool;
        settings.last_color = self.color;
        settings.last_font_size = self.font_size;
        settings.last_mosaic_size = self.mosaic_size;
    }
}

impl Default for ToolState {
    fn default() -> Self {
        Self::from_settings(&UserSettings::default())
    }
}

/// In-progress pointer interaction. Geometry is in image space.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        tool: Tool,
        start: Point,
        current: Point,
    },
    Smearing {
        brush: MosaicSize,
        points: Vec<Point>,
    },
    TextEditing {
        anchor: Point,
        buffer: String,
    },
}

/// Input to the session. Pointer positions are canvas-local.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    PointerDown(Pos2),
    PointerMove(Pos2),
    PointerUp(Pos2),
    Hover(Option<Pos2>),
    Scroll { pointer: Pos2, zoom_in: bool },
    Pan(Vec2),
    CanvasResized(Vec2),
    FitToCanvas,
    SelectTool(Tool),
    SetColor(Rgba),
    SetFontSize(FontSize),
    SetMosaicSize(MosaicSize),
    TextChanged(String),
    CommitText,
    CancelText,
    Undo,
    RequestClear,
    ConfirmClear,
    DismissClear,
    Finish,
    Cancel,
}

pub enum SessionOutcome {
    Finished(RgbaImage),
    Cancelled,
}

/// Editing state for one captured image: the pristine original, the raster
/// buffer with every committed op burned in, and the log that rebuilds it.
pub struct EditorSession {
    compositor: Compositor,
    min_drag_px: f32,
    original: RgbaImage,
    buffer: RgbaImage,
    log: AnnotationLog,
    tools: ToolState,
    gesture: Gesture,
    viewport: Viewport,
    hover: Option<Pos2>,
    pending_clear: bool,
    revision: u64,
    terminal: bool,
    outcome: Option<SessionOutcome>,
}

impl EditorSession {
    pub fn new(image: RgbaImage, config: &EditorConfig, tools: ToolState) -> Self {
        let original = fit_within(image, config.max_image_size);
        let image_size = Vec2::new(original.width() as f32, original.height() as f32);
        log::debug!(
            "editor session opened on {}x{} image",
            original.width(),
            original.height()
        );
        Self {
            compositor: Compositor::new(config),
            min_drag_px: config.min_drag_px,
            buffer: original.clone(),
            original,
            log: AnnotationLog::new(),
            tools,
            gesture: Gesture::Idle,
            viewport: Viewport::new(config, image_size),
            hover: None,
            pending_clear: false,
            revision: 0,
            terminal: false,
            outcome: None,
        }
    }

    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    pub fn log(&self) -> &AnnotationLog {
        &self.log
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn hover(&self) -> Option<Pos2> {
        self.hover
    }

    pub fn pending_clear(&self) -> bool {
        self.pending_clear
    }

    /// Bumped whenever the raster buffer changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn take_outcome(&mut self) -> Option<SessionOutcome> {
        self.outcome.take()
    }

    /// Dispatches one event. Returns `true` when the canvas needs a redraw.
    pub fn handle(&mut self, event: EditorEvent) -> bool {
        if self.terminal {
            return false;
        }

        match event {
            EditorEvent::PointerDown(pos) => self.pointer_down(pos),
            EditorEvent::PointerMove(pos) => self.pointer_move(pos),
            EditorEvent::PointerUp(pos) => self.pointer_up(pos),
            EditorEvent::Hover(pos) => {
                let changed = self.hover != pos;
                self.hover = pos;
                changed && self.tools.tool == Tool::Mosaic
            }
            EditorEvent::Scroll { pointer, zoom_in } => self.viewport.zoom_at(pointer, zoom_in),
            EditorEvent::Pan(delta) => self.viewport.pan_by(delta),
            EditorEvent::CanvasResized(size) => self.viewport.set_canvas_size(size),
            EditorEvent::FitToCanvas => {
                self.viewport.fit_to_canvas();
                true
            }
            EditorEvent::SelectTool(tool) => {
                if self.tools.tool == tool {
                    return false;
                }
                self.end_smear();
                self.gesture = Gesture::Idle;
                self.tools.tool = tool;
                true
            }
            EditorEvent::SetColor(color) => replace(&mut self.tools.color, color),
            EditorEvent::SetFontSize(size) => replace(&mut self.tools.font_size, size),
            EditorEvent::SetMosaicSize(size) => replace(&mut self.tools.mosaic_size, size),
            EditorEvent::TextChanged(text) => match &mut self.gesture {
                Gesture::TextEditing { buffer, .. } => replace(buffer, text),
                _ => false,
            },
            EditorEvent::CommitText => self.commit_text(),
            EditorEvent::CancelText => {
                if !matches!(self.gesture, Gesture::TextEditing { .. }) {
                    return false;
                }
                self.gesture = Gesture::Idle;
                true
            }
            EditorEvent::Undo => self.undo_last(),
            EditorEvent::RequestClear => {
                if self.log.is_empty() {
                    return false;
                }
                self.pending_clear = true;
                true
            }
            EditorEvent::ConfirmClear => {
                if !self.pending_clear {
                    return false;
                }
                self.clear_all();
                true
            }
            EditorEvent::DismissClear => replace(&mut self.pending_clear, false),
            EditorEvent::Finish => {
                self.end_smear();
                log::debug!("editor finished with {} annotations", self.log.len());
                self.gesture = Gesture::Idle;
                self.terminal = true;
                self.outcome = Some(SessionOutcome::Finished(self.buffer.clone()));
                true
            }
            EditorEvent::Cancel => {
                log::debug!("editor cancelled");
                self.gesture = Gesture::Idle;
                self.terminal = true;
                self.outcome = Some(SessionOutcome::Cancelled);
                true
            }
        }
    }

    /// Drops the newest op and rebuilds the buffer from the original.
    pub fn undo_last(&mut self) -> bool {
        let abandoned_smear = matches!(self.gesture, Gesture::Smearing { .. });
        self.gesture = Gesture::Idle;

        match self.log.undo_last() {
            Some(op) => {
                log::debug!("undo {} annotation, {} left", op.label(), self.log.len());
                self.rebuild_buffer();
                true
            }
            None if abandoned_smear => {
                self.rebuild_buffer();
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        log::debug!("clearing {} annotations", self.log.len());
        self.log.clear();
        self.gesture = Gesture::Idle;
        self.pending_clear = false;
        self.buffer = self.original.clone();
        self.revision += 1;
    }

    fn rebuild_buffer(&mut self) {
        self.buffer = self.compositor.replay(&self.original, self.log.list());
        self.revision += 1;
    }

    fn to_image(&self, pos: Pos2) -> Point {
        self.viewport.mapper().to_image(pos).to_pixel()
    }

    fn pointer_down(&mut self, pos: Pos2) -> bool {
        let point = self.to_image(pos);
        match self.tools.tool {
            Tool::Rectangle | Tool::Arrow => {
                self.gesture = Gesture::Drawing {
                    tool: self.tools.tool,
                    start: point,
                    current: point,
                };
            }
            Tool::Mosaic => {
                let brush = self.tools.mosaic_size;
                self.compositor.mosaic_dab(&mut self.buffer, point, brush);
                self.revision += 1;
                self.gesture = Gesture::Smearing {
                    brush,
                    points: vec![point],
                };
            }
            Tool::Text => {
                // A second click moves the input box; unfinished text is dropped.
                self.gesture = Gesture::TextEditing {
                    anchor: point,
                    buffer: String::new(),
                };
            }
        }
        true
    }

    fn pointer_move(&mut self, pos: Pos2) -> bool {
        let point = self.to_image(pos);
        match &mut self.gesture {
            Gesture::Drawing { current, .. } => replace(current, point),
            Gesture::Smearing { brush, points } => {
                let brush = *brush;
                points.push(point);
                self.compositor.mosaic_dab(&mut self.buffer, point, brush);
                self.revision += 1;
                true
            }
            Gesture::Idle | Gesture::TextEditing { .. } => false,
        }
    }

    fn pointer_up(&mut self, pos: Pos2) -> bool {
        if self.end_smear() {
            return true;
        }
        let point = self.to_image(pos);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Drawing { tool, start, .. } => {
                if let Some(op) = self.shape_op(tool, start, point) {
                    self.commit(op);
                }
                true
            }
            other => {
                self.gesture = other;
                false
            }
        }
    }

    /// Logs the smear in progress. Its dabs are already in the buffer, so the
    /// log has to hold them before the gesture is dropped.
    fn end_smear(&mut self) -> bool {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Smearing { brush, points } => {
                log::debug!("committed mosaic smear of {} dabs", points.len());
                self.log.append(AnnotationOp::MosaicSmear { brush, points });
                true
            }
            other => {
                self.gesture = other;
                false
            }
        }
    }

    fn shape_op(&self, tool: Tool, start: Point, end: Point) -> Option<AnnotationOp> {
        let color = self.tools.color;
        match tool {
            Tool::Rectangle => {
                let delta = start.delta(end);
                if delta.x.abs() < self.min_drag_px || delta.y.abs() < self.min_drag_px {
                    return None;
                }
                Some(AnnotationOp::Rectangle {
                    rect: RectData::from_corners(start, end),
                    color,
                })
            }
            Tool::Arrow => {
                if start == end {
                    return None;
                }
                Some(AnnotationOp::Arrow {
                    from: start,
                    to: end,
                    color,
                })
            }
            Tool::Text | Tool::Mosaic => None,
        }
    }

    fn commit_text(&mut self) -> bool {
        let Gesture::TextEditing { anchor, buffer } =
            std::mem::replace(&mut self.gesture, Gesture::Idle)
        else {
            return false;
        };
        if !buffer.trim().is_empty() {
            self.commit(AnnotationOp::Text {
                pos: anchor,
                text: buffer,
                color: self.tools.color,
                size: self.tools.font_size,
            });
        }
        true
    }

    fn commit(&mut self, op: AnnotationOp) {
        if let Err(err) = self.compositor.apply(&mut self.buffer, &op) {
            log::warn!("cannot draw {} annotation: {err:#}", op.label());
        }
        self.log.append(op);
        self.revision += 1;
        log::debug!("committed annotation #{}", self.log.len());
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn fit_within(image: RgbaImage, max_size: Option<[u32; 2]>) -> RgbaImage {
    let Some([max_w, max_h]) = max_size else {
        return image;
    };
    let (width, height) = image.dimensions();
    if max_w == 0 || max_h == 0 || (width <= max_w && height <= max_h) {
        return image;
    }
    let ratio = (max_w as f32 / width as f32).min(max_h as f32 / height as f32);
    let new_w = ((width as f32 * ratio) as u32).max(1);
    let new_h = ((height as f32 * ratio) as u32).max(1);
    log::debug!("downscaling {width}x{height} capture to {new_w}x{new_h}");
    image::imageops::resize(&image, new_w, new_h, FilterType::Lanczos3)
}
