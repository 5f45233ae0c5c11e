// shrinkray/src/utils/mod.rs
use crate::core::{Result, ShrinkrayError, TargetFormat};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAX_COLLISION_SUFFIX: usize = 10_000;

/// Extensions the codec adapter can decode.
pub const SUPPORTED_EXTENSIONS: [&str; 8] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp",
];

pub fn is_supported_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Output path for a source file: `<output_dir>[/<ext>]/<prefix_>stem.<ext>`.
/// Collisions are resolved later, at write time.
pub fn build_output_path(
    output_dir: &Path,
    organize_by_format: bool,
    format: TargetFormat,
    prefix: Option<&str>,
    source: &Path,
) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    let file_name = match prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{prefix}_{stem}.{}", format.extension())
        }
        _ => format!("{stem}.{}", format.extension()),
    };

    if organize_by_format {
        output_dir.join(format.extension()).join(file_name)
    } else {
        output_dir.join(file_name)
    }
}

/// Write `data` to `path`, or to the first free `stem_N` variant when the
/// name is taken. `create_new` keeps the claim atomic under concurrent
/// workers. A failed write removes the partial file before returning.
pub fn write_unique(path: &Path, data: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_string());

    let mut candidate = path.to_path_buf();
    let mut counter = 0usize;

    loop {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                if let Err(e) = file.write_all(data) {
                    drop(file);
                    let _ = std::fs::remove_file(&candidate);
                    return Err(e.into());
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter += 1;
                if counter > MAX_COLLISION_SUFFIX {
                    return Err(ShrinkrayError::ProcessingError(format!(
                        "Could not find a free output name for {}",
                        path.display()
                    )));
                }
                let file_name = match &extension {
                    Some(ext) => format!("{stem}_{counter}.{ext}"),
                    None => format!("{stem}_{counter}"),
                };
                candidate = path.with_file_name(file_name);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.log10() / base.log10()).floor() as i32;
    let exponent = exponent.clamp(0, UNITS.len() as i32 - 1);
    let size = bytes_f64 / base.powi(exponent);

    format!("{:.2} {}", size, UNITS[exponent as usize])
}

pub fn calculate_aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        0.0
    } else {
        width as f32 / height as f32
    }
}

pub fn image_format_to_string(format: image::ImageFormat) -> String {
    match format {
        image::ImageFormat::Jpeg => "JPEG",
        image::ImageFormat::Png => "PNG",
        image::ImageFormat::Gif => "GIF",
        image::ImageFormat::WebP => "WebP",
        image::ImageFormat::Pnm => "PNM",
        image::ImageFormat::Tiff => "TIFF",
        image::ImageFormat::Tga => "TGA",
        image::ImageFormat::Dds => "DDS",
        image::ImageFormat::Bmp => "BMP",
        image::ImageFormat::Ico => "ICO",
        image::ImageFormat::Hdr => "HDR",
        image::ImageFormat::OpenExr => "OpenEXR",
        image::ImageFormat::Farbfeld => "Farbfeld",
        image::ImageFormat::Avif => "AVIF",
        image::ImageFormat::Qoi => "QOI",
        _ => "Unknown",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_supported_extensions() {
        assert!(is_supported_format(Path::new("photo.JPG")));
        assert!(is_supported_format(Path::new("photo.webp")));
        assert!(!is_supported_format(Path::new("document.pdf")));
        assert!(!is_supported_format(Path::new("noext")));
    }

    #[test]
    fn builds_flat_and_organized_paths() {
        let flat = build_output_path(
            Path::new("out"),
            false,
            TargetFormat::Jpeg,
            None,
            Path::new("in/photo.png"),
        );
        assert_eq!(flat, Path::new("out/photo.jpg"));

        let organized = build_output_path(
            Path::new("out"),
            true,
            TargetFormat::WebP,
            Some("small"),
            Path::new("in/photo.png"),
        );
        assert_eq!(organized, Path::new("out/webp/small_photo.webp"));
    }

    #[test]
    fn write_unique_appends_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");

        let first = write_unique(&path, b"one").unwrap();
        let second = write_unique(&path, b"two").unwrap();
        let third = write_unique(&path, b"three").unwrap();

        assert_eq!(first, path);
        assert_eq!(second, dir.path().join("photo_1.jpg"));
        assert_eq!(third, dir.path().join("photo_2.jpg"));
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn write_unique_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jpg").join("photo.jpg");
        let written = write_unique(&path, b"data").unwrap();
        assert_eq!(written, path);
    }

    #[test]
    fn formats_file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1_572_864), "1.50 MB");
    }
}
