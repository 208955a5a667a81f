use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use chrono::Local;
use eframe::egui::{self, Context as EguiContext, Key, RichText, TextureHandle, TopBottomPanel};
use eframe::{App, Frame};
use image::RgbaImage;

use crate::action_bar;
use crate::annotation::Tool;
use crate::canvas::{self, CanvasTexture};
use crate::capture::{
    crop_region, CaptureMode, CaptureProvider, HostWindow, PendingCapture, RegionSelection, ScreenCapture,
    SelectionOutcome, ViewportHost,
};
use crate::config::{EditorConfig, UserSettings};
use crate::records::{self, RecordStore, ScreenshotSink};
use crate::session::{EditorEvent, EditorSession, SessionOutcome, ToolState};
use crate::theme::{self, ThemeColors};
use crate::toolbar;
use crate::ui_controls;

enum Screen {
    Home,
    Hiding(PendingCapture),
    SelectingRegion {
        screen: RgbaImage,
        texture: TextureHandle,
        selection: RegionSelection,
        too_small: bool,
    },
    Editing {
        session: EditorSession,
        texture: CanvasTexture,
    },
}

struct StatusLine {
    text: String,
    is_error: bool,
}

#[derive(Default)]
struct HomeState {
    task: String,
    notes: String,
    screenshot: Option<RgbaImage>,
    preview: Option<TextureHandle>,
    status: Option<StatusLine>,
}

pub struct TracemarkApp {
    config: EditorConfig,
    settings: UserSettings,
    theme: ThemeColors,
    capture: Box<dyn CaptureProvider>,
    store: Option<RecordStore>,
    screen: Screen,
    home: HomeState,
}

impl TracemarkApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: EditorConfig) -> Self {
        let settings = UserSettings::load().unwrap_or_else(|err| {
            log::debug!("using default settings: {err:#}");
            UserSettings::default()
        });
        let theme = ThemeColors::for_mode(settings.dark_mode);
        theme::apply_theme(&cc.egui_ctx, &theme);

        let store = match RecordStore::open_default(&config) {
            Ok(store) => {
                log::info!("screenshots go to {}", store.screenshot_dir().display());
                Some(store)
            }
            Err(err) => {
                log::warn!("record store unavailable: {err:#}");
                None
            }
        };

        Self {
            config,
            settings,
            theme,
            capture: Box::new(ScreenCapture),
            store,
            screen: Screen::Home,
            home: HomeState::default(),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.home.status = Some(StatusLine {
            text: text.into(),
            is_error,
        });
    }

    fn request_capture(&mut self, ctx: &EguiContext, mode: CaptureMode) {
        ViewportHost(ctx).minimize();
        let delay = Duration::from_millis(self.config.capture_delay_ms);
        self.screen = Screen::Hiding(PendingCapture::new(mode, delay, Instant::now()));
        ctx.request_repaint_after(delay);
    }

    fn poll_capture(&mut self, ctx: &EguiContext) {
        let Screen::Hiding(pending) = &self.screen else {
            return;
        };
        let now = Instant::now();
        if !pending.is_due(now) {
            ctx.request_repaint_after(pending.remaining(now));
            return;
        }
        let mode = pending.mode;

        let captured = self.capture.capture_full_screen();
        ViewportHost(ctx).restore();

        let Some(image) = captured else {
            self.set_status("Screen capture failed", true);
            self.screen = Screen::Home;
            return;
        };

        match mode {
            CaptureMode::FullScreen => self.open_editor(image),
            CaptureMode::Region => {
                let texture = ctx.load_texture(
                    "tracemark_region",
                    canvas::to_color_image(&image),
                    egui::TextureOptions::LINEAR,
                );
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(true));
                self.screen = Screen::SelectingRegion {
                    screen: image,
                    texture,
                    selection: RegionSelection::new(self.config.min_region_px),
                    too_small: false,
                };
            }
        }
    }

    fn open_editor(&mut self, image: RgbaImage) {
        let tools = ToolState::from_settings(&self.settings);
        self.screen = Screen::Editing {
            session: EditorSession::new(image, &self.config, tools),
            texture: CanvasTexture::default(),
        };
    }

    fn set_screenshot(&mut self, ctx: &EguiContext, image: Option<RgbaImage>) {
        self.home.preview = image.as_ref().map(|image| {
            ctx.load_texture(
                "tracemark_preview",
                canvas::to_color_image(image),
                egui::TextureOptions::LINEAR,
            )
        });
        self.home.screenshot = image;
    }

    fn save_record(&mut self) {
        let Some(image) = self.home.screenshot.as_ref() else {
            return;
        };
        let Some(store) = self.store.as_mut() else {
            self.set_status("No data directory available for records", true);
            return;
        };

        match store.store(image, &self.home.task, &self.home.notes) {
            Ok(path) => {
                self.home.notes.clear();
                self.home.screenshot = None;
                self.home.preview = None;
                self.set_status(format!("Saved {}", path.display()), false);
            }
            Err(err) => {
                log::warn!("cannot save record: {err:#}");
                self.set_status(format!("{err:#}"), true);
            }
        }
    }

    fn persist_settings(&mut self, tools: Option<&ToolState>) {
        if let Some(tools) = tools {
            tools.store_into(&mut self.settings);
        }
        if let Err(err) = self.settings.save() {
            log::warn!("cannot save settings: {err:#}");
        }
    }

    fn show_home(&mut self, ctx: &EguiContext) {
        let mut capture_mode = None;
        let mut annotate = false;
        let mut save = false;
        let mut toggle_dark = false;
        let theme = self.theme.clone();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(12.0);
            ui_controls::card_frame(&theme).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Tracemark");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let label = if theme.dark { "☀ Light" } else { "☾ Dark" };
                        if ui_controls::ghost_button(ui, &theme, label, egui::vec2(80.0, 26.0)).clicked() {
                            toggle_dark = true;
                        }
                    });
                });
                ui.add_space(8.0);

                ui_controls::muted_label(ui, &theme, "Task / project");
                ui.add(egui::TextEdit::singleline(&mut self.home.task).desired_width(f32::INFINITY));
                ui_controls::muted_label(ui, &theme, "Notes");
                ui.add(
                    egui::TextEdit::multiline(&mut self.home.notes)
                        .desired_rows(3)
                        .desired_width(f32::INFINITY),
                );
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    let size = egui::vec2(120.0, 30.0);
                    if ui_controls::primary_button(ui, &theme, "Full screen", size).clicked() {
                        capture_mode = Some(CaptureMode::FullScreen);
                    }
                    if ui_controls::ghost_button(ui, &theme, "Region", size).clicked() {
                        capture_mode = Some(CaptureMode::Region);
                    }
                    let has_shot = self.home.screenshot.is_some();
                    if ui
                        .add_enabled_ui(has_shot, |ui| ui_controls::ghost_button(ui, &theme, "Annotate", size))
                        .inner
                        .clicked()
                    {
                        annotate = true;
                    }
                    if ui
                        .add_enabled_ui(has_shot, |ui| ui_controls::primary_button(ui, &theme, "Save record", size))
                        .inner
                        .clicked()
                    {
                        save = true;
                    }
                });

                if let Some(status) = &self.home.status {
                    let color = if status.is_error { theme.danger } else { theme.text_muted };
                    ui.label(RichText::new(&status.text).color(color).size(12.0));
                }
            });

            if let Some(preview) = &self.home.preview {
                ui.add_space(12.0);
                ui.add(
                    egui::Image::from_texture((preview.id(), preview.size_vec2()))
                        .max_size(ui.available_size())
                        .maintain_aspect_ratio(true),
                );
            }
        });

        if toggle_dark {
            self.settings.dark_mode = !self.settings.dark_mode;
            self.theme = ThemeColors::for_mode(self.settings.dark_mode);
            theme::apply_theme(ctx, &self.theme);
            self.persist_settings(None);
        }
        if let Some(mode) = capture_mode {
            self.request_capture(ctx, mode);
        } else if annotate {
            if let Some(image) = self.home.screenshot.clone() {
                self.open_editor(image);
            }
        } else if save {
            self.save_record();
        }
    }

    fn show_region_picker(&mut self, ctx: &EguiContext) {
        let Screen::SelectingRegion {
            screen,
            texture,
            selection,
            too_small,
        } = &mut self.screen
        else {
            return;
        };

        let image_size = texture.size_vec2();
        let outcome = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let outcome = canvas::show_region_selector(ui, texture.id(), image_size, selection);
                if *too_small {
                    ui.painter().text(
                        ui.max_rect().center_bottom() - egui::vec2(0.0, 40.0),
                        egui::Align2::CENTER_CENTER,
                        "Selection too small, drag again",
                        egui::FontId::proportional(16.0),
                        egui::Color32::from_rgb(0xFF, 0xDC, 0x00),
                    );
                }
                outcome
            })
            .inner;

        match outcome {
            SelectionOutcome::Pending => {}
            SelectionOutcome::TooSmall => *too_small = true,
            SelectionOutcome::Cancelled => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
                log::info!("region capture cancelled");
                self.screen = Screen::Home;
            }
            SelectionOutcome::Selected(bounds) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
                match crop_region(screen, bounds) {
                    Some(image) => self.open_editor(image),
                    None => {
                        self.set_status("Selected region is outside the screen", true);
                        self.screen = Screen::Home;
                    }
                }
            }
        }
    }

    fn show_editor(&mut self, ctx: &EguiContext) {
        let theme = self.theme.clone();
        let Screen::Editing { session, texture } = &mut self.screen else {
            return;
        };

        let mut events = Vec::new();
        let mut save_copy = false;

        TopBottomPanel::top("tracemark_toolbar")
            .frame(ui_controls::toolbar_frame(&theme))
            .show(ctx, |ui| toolbar::show_toolbar(ui, session.tools(), &theme, &mut events));

        TopBottomPanel::bottom("tracemark_action_bar")
            .frame(ui_controls::action_bar_frame(&theme))
            .show(ctx, |ui| {
                let out = action_bar::show_action_bar(ui, session, &theme, &mut events);
                save_copy = out.save_copy;
            });

        let texture_id = texture.sync(ctx, session);
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| canvas::show_canvas(ui, session, texture_id, &theme, &mut events));

        if session.pending_clear() {
            action_bar::show_clear_dialog(ctx, &theme, &mut events);
        }

        if !session.is_terminal() {
            save_copy |= collect_editor_shortcuts(ctx, session, &mut events);
        }

        let mut redraw = false;
        for event in events {
            redraw |= session.handle(event);
        }
        if redraw {
            ctx.request_repaint();
        }

        if save_copy {
            if let Err(err) = save_copy_dialog(session.buffer()) {
                log::warn!("save copy failed: {err:#}");
            }
        }

        let tools = *session.tools();
        match session.take_outcome() {
            Some(SessionOutcome::Finished(image)) => {
                self.persist_settings(Some(&tools));
                self.set_screenshot(ctx, Some(image));
                self.set_status("Annotated capture ready, fill in the task and save", false);
                self.screen = Screen::Home;
            }
            Some(SessionOutcome::Cancelled) => {
                self.persist_settings(Some(&tools));
                self.screen = Screen::Home;
            }
            None => {}
        }
    }
}

/// Keyboard shortcuts for the editor. Returns `true` when a copy should be saved.
fn collect_editor_shortcuts(ctx: &EguiContext, session: &EditorSession, events: &mut Vec<EditorEvent>) -> bool {
    if ctx.wants_keyboard_input() {
        return false;
    }
    let cmd = ctx.input(|input| input.modifiers.command || input.modifiers.ctrl);
    let pressed = |key: Key| ctx.input(|input| input.key_pressed(key));

    if !cmd {
        for (key, tool) in [
            (Key::R, Tool::Rectangle),
            (Key::A, Tool::Arrow),
            (Key::T, Tool::Text),
            (Key::M, Tool::Mosaic),
        ] {
            if pressed(key) {
                events.push(EditorEvent::SelectTool(tool));
            }
        }
        return false;
    }

    if pressed(Key::Z) {
        events.push(EditorEvent::Undo);
    }
    if pressed(Key::Enter) {
        events.push(EditorEvent::Finish);
    }
    if pressed(Key::Num0) {
        events.push(EditorEvent::FitToCanvas);
    }
    if let Some(canvas) = session.viewport().canvas_size() {
        let center = (canvas * 0.5).to_pos2();
        if pressed(Key::Plus) || pressed(Key::Equals) {
            events.push(EditorEvent::Scroll {
                pointer: center,
                zoom_in: true,
            });
        }
        if pressed(Key::Minus) {
            events.push(EditorEvent::Scroll {
                pointer: center,
                zoom_in: false,
            });
        }
    }
    pressed(Key::S)
}

fn save_copy_dialog(image: &RgbaImage) -> Result<()> {
    let default_name = format!("Screenshot {}.png", Local::now().format("%Y-%m-%d at %H.%M.%S"));

    let file = rfd::FileDialog::new()
        .set_title("Save a copy of the annotated screenshot")
        .set_file_name(&default_name)
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .save_file();

    let Some(path) = file else {
        return Ok(());
    };
    records::export_image(image, &path).context("export failed")
}

impl App for TracemarkApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        self.poll_capture(ctx);

        match &self.screen {
            Screen::Home => self.show_home(ctx),
            Screen::Hiding(_) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.centered_and_justified(|ui| ui.label("Capturing…"));
                });
            }
            Screen::SelectingRegion { .. } => self.show_region_picker(ctx),
            Screen::Editing { .. } => self.show_editor(ctx),
        }
    }
}
