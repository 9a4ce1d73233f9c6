/*!
 * Fixed-size image cropping
 * Crop window state, overlay preview and crop export
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);
const OUTLINE_WIDTH: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Position and size of the crop window over one image.
///
/// The window always lies inside the image: the crop size is clamped on
/// construction and every move is clamped to `[0, max_x] x [0, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropState {
    pub x: u32,
    pub y: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub crop_width: u32,
    pub crop_height: u32,
}

impl CropState {
    /// Centered window of the requested size, shrunk to fit the image.
    pub fn new(image_width: u32, image_height: u32, requested_width: u32, requested_height: u32) -> Self {
        let mut state = Self {
            x: 0,
            y: 0,
            image_width,
            image_height,
            crop_width: requested_width.max(1).min(image_width),
            crop_height: requested_height.max(1).min(image_height),
        };
        state.center();
        state
    }

    pub fn max_x(&self) -> u32 {
        self.image_width - self.crop_width
    }

    pub fn max_y(&self) -> u32 {
        self.image_height - self.crop_height
    }

    pub fn center(&mut self) {
        self.x = self.max_x() / 2;
        self.y = self.max_y() / 2;
    }

    pub fn nudge(&mut self, direction: Direction, step: u32) {
        match direction {
            Direction::Up => self.y = self.y.saturating_sub(step),
            Direction::Down => self.y = self.y.saturating_add(step).min(self.max_y()),
            Direction::Left => self.x = self.x.saturating_sub(step),
            Direction::Right => self.x = self.x.saturating_add(step).min(self.max_x()),
        }
    }

    /// Move to an explicit offset, clamped into range.
    pub fn move_to(&mut self, x: u32, y: u32) {
        self.x = x.min(self.max_x());
        self.y = y.min(self.max_y());
    }

    /// True when the image forced a smaller window than requested.
    pub fn is_reduced(&self, requested_width: u32, requested_height: u32) -> bool {
        self.crop_width < requested_width || self.crop_height < requested_height
    }

    fn same_geometry(&self, other: &CropState) -> bool {
        self.image_width == other.image_width
            && self.image_height == other.image_height
            && self.crop_width == other.crop_width
            && self.crop_height == other.crop_height
    }
}

/// Crop windows of every image opened in one session, keyed by image name.
#[derive(Debug, Default)]
pub struct CropSession {
    states: HashMap<String, CropState>,
}

impl CropSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current window for `name`. A new window is started, centered, when the
    /// image is new or its size or the effective crop size changed.
    pub fn state_for(
        &mut self,
        name: &str,
        image_width: u32,
        image_height: u32,
        requested_width: u32,
        requested_height: u32,
    ) -> &mut CropState {
        let fresh = CropState::new(image_width, image_height, requested_width, requested_height);
        let state = self.states.entry(name.to_string()).or_insert(fresh);
        if !state.same_geometry(&fresh) {
            tracing::debug!("Crop geometry changed for {}, recentering", name);
            *state = fresh;
        }
        state
    }

    pub fn get(&self, name: &str) -> Option<&CropState> {
        self.states.get(name)
    }

    pub fn forget(&mut self, name: &str) {
        self.states.remove(name);
    }
}

/// A decoded source image.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    /// File name, used as the session key.
    pub name: String,
    /// File name without extension, used to name crops.
    pub stem: String,
    pub pixels: RgbaImage,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Read and decode an image, converting it to RGBA.
pub fn load_image(path: impl AsRef<Path>) -> Result<SourceImage> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());

    let bytes = fs::read(path).map_err(|e| Error::io("failed to read", path, e))?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| Error::ImageDecode {
        name: name.clone(),
        source,
    })?;

    tracing::info!("Loaded image {} ({}x{})", name, decoded.width(), decoded.height());
    Ok(SourceImage {
        path: path.to_path_buf(),
        name,
        stem,
        pixels: decoded.to_rgba8(),
    })
}

/// Copy of `image` with a red rectangle drawn just inside the crop window.
pub fn render_overlay(image: &RgbaImage, state: &CropState) -> RgbaImage {
    let mut overlay = image.clone();

    for inset in 0..OUTLINE_WIDTH {
        let width = state.crop_width.saturating_sub(2 * inset);
        let height = state.crop_height.saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((state.x + inset) as i32, (state.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(&mut overlay, rect, OUTLINE);
    }

    overlay
}

pub fn crop_image(image: &RgbaImage, state: &CropState) -> RgbaImage {
    imageops::crop_imm(image, state.x, state.y, state.crop_width, state.crop_height).to_image()
}

/// `<base>_crop_<x>_<y>_<w>x<h>.png`
pub fn crop_file_name(base_name: &str, state: &CropState) -> String {
    format!(
        "{}_crop_{}_{}_{}x{}.png",
        base_name, state.x, state.y, state.crop_width, state.crop_height
    )
}

/// Crop `source` at `state` and write it as PNG into `output_dir`.
pub fn save_crop(source: &SourceImage, state: &CropState, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| Error::io("failed to create", output_dir, e))?;

    let path = output_dir.join(crop_file_name(&source.stem, state));
    save_png(&crop_image(&source.pixels, state), &path)?;

    tracing::info!("Saved cropped image to {}", path.display());
    Ok(path)
}

/// Write the overlay preview for `state` to `path`.
pub fn save_preview(source: &SourceImage, state: &CropState, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io("failed to create", parent, e))?;
    }
    save_png(&render_overlay(&source.pixels, state), path)?;

    tracing::info!("Saved preview to {}", path.display());
    Ok(())
}

fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 40, 255]))
    }

    fn source(width: u32, height: u32) -> SourceImage {
        SourceImage {
            path: PathBuf::from("photo.jpg"),
            name: "photo.jpg".to_string(),
            stem: "photo".to_string(),
            pixels: gradient(width, height),
        }
    }

    #[test]
    fn oversized_crop_clamps_to_image() {
        let state = CropState::new(150, 150, 200, 200);

        assert_eq!((state.crop_width, state.crop_height), (150, 150));
        assert_eq!((state.x, state.y), (0, 0));
        assert!(state.is_reduced(200, 200));
    }

    #[test]
    fn clamps_each_axis_independently() {
        let state = CropState::new(640, 120, 200, 200);

        assert_eq!((state.crop_width, state.crop_height), (200, 120));
        assert_eq!((state.max_x(), state.max_y()), (440, 0));
    }

    #[test]
    fn starts_centered_with_integer_division() {
        let state = CropState::new(301, 250, 200, 200);

        assert_eq!((state.x, state.y), (50, 25));
        assert!(!state.is_reduced(200, 200));
    }

    #[test]
    fn moves_stay_within_bounds() {
        let mut state = CropState::new(260, 230, 200, 200);
        let directions = [
            Direction::Up,
            Direction::Left,
            Direction::Right,
            Direction::Down,
            Direction::Right,
            Direction::Down,
        ];

        for step in [1, 7, 25, 1000, u32::MAX] {
            for direction in directions {
                state.nudge(direction, step);
                assert!(state.x <= state.max_x());
                assert!(state.y <= state.max_y());
                assert!(state.x + state.crop_width <= state.image_width);
                assert!(state.y + state.crop_height <= state.image_height);
            }
        }
    }

    #[test]
    fn nudge_moves_by_step() {
        let mut state = CropState::new(400, 400, 200, 200);
        assert_eq!((state.x, state.y), (100, 100));

        state.nudge(Direction::Left, 10);
        state.nudge(Direction::Down, 30);
        assert_eq!((state.x, state.y), (90, 130));

        state.nudge(Direction::Up, 500);
        state.nudge(Direction::Right, 500);
        assert_eq!((state.x, state.y), (200, 0));

        state.center();
        assert_eq!((state.x, state.y), (100, 100));
    }

    #[test]
    fn move_to_clamps() {
        let mut state = CropState::new(300, 260, 200, 200);
        state.move_to(1_000, 7);
        assert_eq!((state.x, state.y), (100, 7));
    }

    #[test]
    fn session_keeps_position_until_geometry_changes() {
        let mut session = CropSession::new();

        session.state_for("a.png", 400, 400, 200, 200).nudge(Direction::Right, 40);
        assert_eq!(session.state_for("a.png", 400, 400, 200, 200).x, 140);

        // A different image keeps its own window.
        assert_eq!(session.state_for("b.png", 400, 400, 200, 200).x, 100);

        // New crop size resets to the centre.
        let state = session.state_for("a.png", 400, 400, 100, 100);
        assert_eq!((state.x, state.y, state.crop_width), (150, 150, 100));

        session.forget("a.png");
        assert!(session.get("a.png").is_none());
        assert!(session.get("b.png").is_some());
    }

    #[test]
    fn overlay_outlines_window_only() {
        let image = gradient(50, 40);
        let mut state = CropState::new(50, 40, 20, 20);
        state.move_to(5, 10);

        let overlay = render_overlay(&image, &state);

        assert_eq!(*overlay.get_pixel(5, 10), OUTLINE);
        assert_eq!(*overlay.get_pixel(24, 29), OUTLINE);
        assert_eq!(*overlay.get_pixel(7, 15), OUTLINE);
        assert_eq!(overlay.get_pixel(15, 20), image.get_pixel(15, 20));
        assert_eq!(overlay.get_pixel(4, 10), image.get_pixel(4, 10));
        assert_eq!(overlay.get_pixel(25, 29), image.get_pixel(25, 29));
    }

    #[test]
    fn overlay_handles_tiny_windows() {
        let image = gradient(2, 2);
        let state = CropState::new(2, 2, 200, 200);
        let overlay = render_overlay(&image, &state);
        assert_eq!(*overlay.get_pixel(0, 0), OUTLINE);
    }

    #[test]
    fn crop_extracts_window() {
        let image = gradient(120, 90);
        let mut state = CropState::new(120, 90, 30, 20);
        state.move_to(17, 33);

        let cropped = crop_image(&image, &state);

        assert_eq!(cropped.dimensions(), (30, 20));
        assert_eq!(cropped.get_pixel(0, 0), image.get_pixel(17, 33));
        assert_eq!(cropped.get_pixel(29, 19), image.get_pixel(46, 52));
    }

    #[test]
    fn crop_file_name_encodes_offset_and_size() {
        let mut state = CropState::new(500, 400, 200, 200);
        state.move_to(12, 34);
        assert_eq!(crop_file_name("holiday", &state), "holiday_crop_12_34_200x200.png");
    }

    #[test]
    fn save_crop_creates_directory() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("crops").join("nested");
        let image = source(150, 150);
        let state = CropState::new(150, 150, 200, 200);

        let path = save_crop(&image, &state, &output).unwrap();

        assert_eq!(path, output.join("photo_crop_0_0_150x150.png"));
        assert_eq!(image::image_dimensions(&path).unwrap(), (150, 150));
    }

    #[test]
    fn save_preview_writes_full_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let image = source(80, 60);
        let state = CropState::new(80, 60, 20, 20);

        save_preview(&image, &state, &path).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (80, 60));
    }

    #[test]
    fn load_round_trips_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.png");
        gradient(33, 21).save(&path).unwrap();

        let loaded = load_image(&path).unwrap();

        assert_eq!(loaded.name, "sample.png");
        assert_eq!(loaded.stem, "sample");
        assert_eq!((loaded.width(), loaded.height()), (33, 21));
    }

    #[test]
    fn corrupt_image_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, Error::ImageDecode { ref name, .. } if name == "broken.png"));
    }

    #[test]
    fn missing_image_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_image(dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
