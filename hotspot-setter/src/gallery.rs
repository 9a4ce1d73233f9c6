/*!
 * Saved crop gallery
 * Images written to the crop output folder
 */

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, PartialEq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Image files directly inside `folder`, sorted by name. A folder that does
/// not exist yet simply has no images.
pub fn list_saved_images(folder: &Path) -> Result<Vec<SavedImage>> {
    if !folder.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(folder).map_err(|e| Error::io("failed to list", folder, e))?;
    let mut images: Vec<SavedImage> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() || !has_image_extension(&path) {
                return None;
            }
            Some(SavedImage {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
                path,
            })
        })
        .collect();

    images.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

pub fn delete_saved_image(image: &SavedImage) -> Result<()> {
    fs::remove_file(&image.path).map_err(|e| Error::io("failed to delete", &image.path, e))?;
    tracing::info!("Deleted {}", image.name);
    Ok(())
}

/// Find a saved image by file name.
pub fn find_saved_image(folder: &Path, name: &str) -> Result<Option<SavedImage>> {
    Ok(list_saved_images(folder)?.into_iter().find(|image| image.name == name))
}

/// Pixel dimensions of a saved image, decoding only its header.
pub fn image_dimensions(image: &SavedImage) -> Result<(u32, u32)> {
    image::image_dimensions(&image.path).map_err(|source| Error::ImageDecode {
        name: image.name.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn missing_folder_is_empty() {
        let dir = tempdir().unwrap();
        assert!(list_saved_images(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn lists_only_images_sorted_by_name() {
        let dir = tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.jpeg", "notes.txt", "d.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("folder.png")).unwrap();

        let names: Vec<String> = list_saved_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|image| image.name)
            .collect();

        assert_eq!(names, vec!["a.JPG", "b.png", "c.jpeg"]);
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("gone.png"), b"x").unwrap();

        let image = find_saved_image(dir.path(), "gone.png").unwrap().unwrap();
        assert_eq!(image.size_bytes, 1);
        assert!(image.modified.is_some());

        delete_saved_image(&image).unwrap();
        assert!(list_saved_images(dir.path()).unwrap().is_empty());

        let err = delete_saved_image(&image).unwrap_err();
        assert!(err.to_string().starts_with("failed to delete"));
    }

    #[test]
    fn reads_dimensions_and_reports_broken_files() {
        let dir = tempdir().unwrap();
        RgbaImage::from_pixel(12, 7, Rgba([0, 0, 0, 255]))
            .save(dir.path().join("ok.png"))
            .unwrap();
        fs::write(dir.path().join("zz.png"), b"garbage").unwrap();

        let images = list_saved_images(dir.path()).unwrap();
        assert_eq!(image_dimensions(&images[0]).unwrap(), (12, 7));
        assert!(matches!(image_dimensions(&images[1]), Err(Error::ImageDecode { .. })));
    }
}
