use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::annotation::{FontSize, MosaicSize, Rgba, Tool};

/// Editor constants, fixed for the lifetime of a session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub stroke_width: u32,
    pub arrow_outline_width: u32,
    pub arrow_head_length: f32,
    pub arrow_head_angle_deg: f32,
    pub highlight_threshold: u32,
    pub highlight_alpha: u8,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    pub min_drag_px: f32,
    pub min_mosaic_block: u32,
    pub font_candidates: Vec<PathBuf>,
    pub max_image_size: Option<[u32; 2]>,
    pub capture_delay_ms: u64,
    pub min_region_px: u32,
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            stroke_width: 4,
            arrow_outline_width: 6,
            arrow_head_length: 20.0,
            arrow_head_angle_deg: 30.0,
            highlight_threshold: 100,
            highlight_alpha: 60,
            min_zoom: 0.2,
            max_zoom: 3.0,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
            min_drag_px: 5.0,
            min_mosaic_block: 3,
            font_candidates: Vec::new(),
            max_image_size: None,
            capture_delay_ms: 1000,
            min_region_px: 10,
            screenshot_dir: None,
        }
    }
}

impl EditorConfig {
    fn file_path() -> Option<PathBuf> {
        config_file("config.json")
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve config path")?;
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw).context("invalid editor config")?;
        config.sanitize();
        Ok(config)
    }

    /// Loads the config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(err) => {
                log::debug!("using default editor config: {err:#}");
                Self::default()
            }
        }
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }
        if self.zoom_in_factor <= 1.0 {
            self.zoom_in_factor = defaults.zoom_in_factor;
        }
        if !(self.zoom_out_factor > 0.0 && self.zoom_out_factor < 1.0) {
            self.zoom_out_factor = defaults.zoom_out_factor;
        }
        self.stroke_width = self.stroke_width.max(1);
        self.min_mosaic_block = self.min_mosaic_block.max(1);
    }
}

/// Tool state remembered between sessions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSettings {
    pub last_tool: Tool,
    pub last_color: Rgba,
    pub last_font_size: FontSize,
    pub last_mosaic_size: MosaicSize,
    pub dark_mode: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            last_tool: Tool::Rectangle,
            last_color: [0xFF, 0x41, 0x36, 0xFF],
            last_font_size: FontSize::DEFAULT,
            last_mosaic_size: MosaicSize::DEFAULT,
            dark_mode: false,
        }
    }
}

impl UserSettings {
    fn file_path() -> Option<PathBuf> {
        config_file("settings.json")
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tracemark", "tracemark")
}

fn config_file(name: &str) -> Option<PathBuf> {
    let dirs = project_dirs()?;
    let config_dir = dirs.config_dir();
    std::fs::create_dir_all(config_dir).ok()?;
    Some(config_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::{EditorConfig, UserSettings};
    use crate::annotation::Tool;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{ "max_zoom": 5.0, "highlight_alpha": 90 }"#)
            .expect("config should parse");
        assert_eq!(config.max_zoom, 5.0);
        assert_eq!(config.highlight_alpha, 90);
        assert_eq!(config.min_zoom, 0.2);
        assert_eq!(config.stroke_width, 4);
    }

    #[test]
    fn invalid_zoom_bounds_fall_back() {
        let config = EditorConfig::from_json(r#"{ "min_zoom": 4.0, "max_zoom": 1.0, "zoom_out_factor": 1.5 }"#)
            .expect("config should parse");
        assert_eq!(config.min_zoom, 0.2);
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.zoom_out_factor, 0.9);
    }

    #[test]
    fn settings_round_trip() {
        let settings = UserSettings {
            last_tool: Tool::Mosaic,
            dark_mode: true,
            ..UserSettings::default()
        };
        let raw = serde_json::to_string(&settings).expect("serialize");
        let back: UserSettings = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back, settings);
    }
}
