use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::config::{project_dirs, EditorConfig};

const FILENAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";
const MAX_PATH_LEN: usize = 250;

/// Destination for finished screenshots.
pub trait ScreenshotSink {
    fn store(&mut self, image: &RgbaImage, task: &str, notes: &str) -> Result<PathBuf>;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    pub id: u64,
    pub task_name: String,
    pub image_path: String,
    pub notes: String,
    pub timestamp: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Screenshot directory plus the `records.json` index that lists them.
pub struct RecordStore {
    records_file: PathBuf,
    screenshot_dir: PathBuf,
}

impl RecordStore {
    pub fn new(data_dir: &Path, screenshot_dir: Option<&Path>) -> Self {
        Self {
            records_file: data_dir.join("records.json"),
            screenshot_dir: screenshot_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| data_dir.join("screenshots")),
        }
    }

    pub fn open_default(config: &EditorConfig) -> Result<Self> {
        let dirs = project_dirs().context("cannot resolve data directory")?;
        Ok(Self::new(dirs.data_dir(), config.screenshot_dir.as_deref()))
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    pub fn load(&self) -> Result<Vec<ActivityRecord>> {
        if !self.records_file.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.records_file)
            .with_context(|| format!("cannot read {}", self.records_file.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid records file {}", self.records_file.display()))
    }

    fn append(&self, record: ActivityRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        if let Some(parent) = self.records_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        std::fs::write(&self.records_file, serde_json::to_string_pretty(&records)?)
            .with_context(|| format!("cannot write {}", self.records_file.display()))?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        let records = self.load()?;
        Ok(records
            .last()
            .map(|record| record.id + 1)
            .unwrap_or(records.len() as u64 + 1))
    }

    fn store_at(&self, image: &RgbaImage, task: &str, notes: &str, now: DateTime<Local>) -> Result<PathBuf> {
        let task = task.trim();
        if task.is_empty() {
            bail!("task name is required");
        }
        let id = self.next_id()?;

        std::fs::create_dir_all(&self.screenshot_dir)
            .with_context(|| format!("cannot create {}", self.screenshot_dir.display()))?;
        let path = screenshot_path(&self.screenshot_dir, task, now);
        image
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("cannot save png to {}", path.display()))?;

        let stamp = now.to_rfc3339();
        let absolute = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        let record = ActivityRecord {
            id,
            task_name: task.to_string(),
            image_path: absolute.to_string_lossy().replace('\\', "/"),
            notes: notes.to_string(),
            timestamp: stamp.clone(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        log::info!("record #{} saved to {}", record.id, path.display());
        self.append(record)?;
        Ok(path)
    }
}

impl ScreenshotSink for RecordStore {
    fn store(&mut self, image: &RgbaImage, task: &str, notes: &str) -> Result<PathBuf> {
        self.store_at(image, task, notes, Local::now())
    }
}

/// Keeps alphanumerics, spaces, `_` and `-`; everything else becomes `_`.
pub fn sanitize_task_name(task: &str) -> String {
    task.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn screenshot_path(dir: &Path, task: &str, now: DateTime<Local>) -> PathBuf {
    let stamp = now.format(FILENAME_TIME_FORMAT);
    let path = dir.join(format!("{stamp}_{}.png", sanitize_task_name(task)));
    if path.to_string_lossy().chars().count() > MAX_PATH_LEN {
        return dir.join(format!("{stamp}_screenshot.png"));
    }
    path
}

/// Writes a copy of the edited image; JPEG for `.jpg`/`.jpeg`, PNG otherwise.
pub fn export_image(image: &RgbaImage, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|item| item.to_str())
        .unwrap_or("png")
        .to_ascii_lowercase();

    if ext == "jpg" || ext == "jpeg" {
        DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, ImageFormat::Jpeg)
            .with_context(|| format!("cannot save jpeg to {}", path.display()))?;
    } else {
        image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("cannot save png to {}", path.display()))?;
    }
    log::info!("exported copy to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use image::{Rgba, RgbaImage};

    use super::{export_image, sanitize_task_name, screenshot_path, RecordStore, ScreenshotSink};

    #[test]
    fn task_name_is_sanitized() {
        assert_eq!(sanitize_task_name("Deploy v2/hotfix: api"), "Deploy v2_hotfix_ api");
        assert_eq!(sanitize_task_name("周报 review_1-a"), "周报 review_1-a");
    }

    #[test]
    fn long_paths_fall_back_to_generic_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("valid time");
        let dir = std::path::Path::new("/tmp/shots");

        let short = screenshot_path(dir, "Weekly sync", now);
        assert_eq!(short, dir.join("20240309_140507_Weekly sync.png"));

        let long = screenshot_path(dir, &"x".repeat(300), now);
        assert_eq!(long, dir.join("20240309_140507_screenshot.png"));
    }

    #[test]
    fn store_writes_png_and_appends_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RecordStore::new(dir.path(), None);
        let image = RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 255]));

        let first = store.store(&image, "Bug #12", "crash on login").expect("first record");
        let second = store.store(&image, "Bug #13", "").expect("second record");

        assert!(first.starts_with(dir.path().join("screenshots")));
        assert!(first.to_string_lossy().ends_with("_Bug _12.png"));
        assert_eq!(image::open(&second).expect("png").to_rgba8(), image);

        let records = store.load().expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[0].task_name, "Bug #12");
        assert_eq!(records[0].notes, "crash on login");
        assert!(!records[0].image_path.contains('\\'));
    }

    #[test]
    fn empty_task_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RecordStore::new(dir.path(), None);
        let image = RgbaImage::new(2, 2);

        assert!(store.store(&image, "   ", "notes").is_err());
        assert!(store.load().expect("records").is_empty());
    }

    #[test]
    fn corrupt_index_is_left_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = dir.path().join("records.json");
        std::fs::write(&index, "{ not json").expect("write index");
        let mut store = RecordStore::new(dir.path(), None);

        assert!(store.store(&RgbaImage::new(2, 2), "Audit", "").is_err());
        assert_eq!(std::fs::read_to_string(&index).expect("index"), "{ not json");
        assert!(!dir.path().join("screenshots").exists());
    }

    #[test]
    fn custom_screenshot_dir_is_used() {
        let data = tempfile::tempdir().expect("data dir");
        let shots = tempfile::tempdir().expect("shots dir");
        let mut store = RecordStore::new(data.path(), Some(shots.path()));

        let path = store.store(&RgbaImage::new(3, 3), "Audit", "").expect("record");
        assert!(path.starts_with(shots.path()));
        assert!(data.path().join("records.json").exists());
    }

    #[test]
    fn export_picks_format_from_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255]));

        let png = dir.path().join("copy.png");
        export_image(&image, &png).expect("png export");
        assert_eq!(image::open(&png).expect("png").to_rgba8(), image);

        let jpeg = dir.path().join("copy.jpeg");
        export_image(&image, &jpeg).expect("jpeg export");
        assert_eq!(image::open(&jpeg).expect("jpeg").color(), image::ColorType::Rgb8);
    }
}
