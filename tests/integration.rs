#[cfg(test)]
mod tests {
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use shrinkray::{
        BatchCoordinator, CancelToken, ErrorKind, MetadataProcessor, ProcessingConfig, Quality,
        ResizeMode, TargetFormat,
    };
    use std::path::{Path, PathBuf};

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 100])
        });
        img.save(path).unwrap();
    }

    /// Minimal little-endian TIFF blob carrying one orientation entry.
    fn tiff_with_orientation(orientation: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"II");
        data.extend_from_slice(&42u16.to_le_bytes());
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&0x0112u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&orientation.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data
    }

    fn count_files(dir: &Path) -> usize {
        walkdir_count(dir)
    }

    fn walkdir_count(dir: &Path) -> usize {
        if !dir.exists() {
            return 0;
        }
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| {
                if e.file_type().unwrap().is_dir() {
                    walkdir_count(&e.path())
                } else {
                    1
                }
            })
            .sum()
    }

    fn run(
        config: ProcessingConfig,
        inputs: &[PathBuf],
        token: &CancelToken,
    ) -> shrinkray::BatchReport {
        BatchCoordinator::new(config)
            .unwrap()
            .run(inputs, token, |_| {})
            .unwrap()
    }

    #[test]
    fn corrupted_item_fails_alone() {
        let temp_dir = TempDir::new().unwrap();
        write_jpeg(temp_dir.child("one.jpg").path(), 32, 32);
        write_jpeg(temp_dir.child("two.jpg").path(), 32, 32);
        temp_dir
            .child("broken.jpg")
            .write_binary(b"not a real jpeg")
            .unwrap();

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            quality: Quality::Fixed(80),
            resize: ResizeMode::None,
            output_dir: output.clone(),
            ..Default::default()
        };

        let report = run(config, &[temp_dir.path().to_path_buf()], &CancelToken::new());

        assert_eq!(report.total, 3);
        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, report.succeeded + report.failed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ErrorKind::Decode);
        assert!(report.failures[0].path.ends_with("broken.jpg"));
        assert_eq!(count_files(&output), 2);
    }

    #[test]
    fn percentage_resize_applies_to_all_outputs() {
        let temp_dir = TempDir::new().unwrap();
        write_jpeg(temp_dir.child("photo.jpg").path(), 800, 600);

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            resize: ResizeMode::Percentage(50),
            output_dir: output.clone(),
            ..Default::default()
        };

        let report = run(config, &[temp_dir.path().to_path_buf()], &CancelToken::new());
        assert_eq!(report.succeeded, 1);

        let out_img = image::open(output.join("photo.jpg")).unwrap();
        assert_eq!(out_img.width(), 400);
        assert_eq!(out_img.height(), 300);
    }

    #[test]
    fn repeat_runs_resolve_collisions_with_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.child("input");
        input_dir.create_dir_all().unwrap();
        write_jpeg(input_dir.child("photo.jpg").path(), 16, 16);

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            output_dir: output.clone(),
            ..Default::default()
        };

        let inputs = [input_dir.path().to_path_buf()];
        run(config.clone(), &inputs, &CancelToken::new());
        run(config, &inputs, &CancelToken::new());

        assert!(output.join("photo.jpg").exists());
        assert!(output.join("photo_1.jpg").exists());
    }

    #[test]
    fn exif_orientation_round_trips_to_exif_capable_formats() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.child("tagged.jpg");
        write_jpeg(source.path(), 24, 24);

        // Stamp the source with a known orientation tag.
        let metadata = MetadataProcessor::new();
        let bytes = std::fs::read(source.path()).unwrap();
        let tagged = metadata
            .embed(&bytes, TargetFormat::Jpeg, &tiff_with_orientation(6))
            .unwrap();
        std::fs::write(source.path(), tagged).unwrap();

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            preserve_exif: true,
            format: TargetFormat::Jpeg,
            output_dir: output.clone(),
            ..Default::default()
        };
        let report = run(
            config,
            &[source.path().to_path_buf()],
            &CancelToken::new(),
        );
        assert_eq!(report.succeeded, 1);

        let out_bytes = std::fs::read(output.join("tagged.jpg")).unwrap();
        assert_eq!(metadata.orientation(&out_bytes), Some(6));
    }

    #[test]
    fn exif_to_formats_without_support_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.child("tagged.jpg");
        write_jpeg(source.path(), 24, 24);

        let metadata = MetadataProcessor::new();
        let bytes = std::fs::read(source.path()).unwrap();
        let tagged = metadata
            .embed(&bytes, TargetFormat::Jpeg, &tiff_with_orientation(6))
            .unwrap();
        std::fs::write(source.path(), tagged).unwrap();

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            preserve_exif: true,
            format: TargetFormat::Bmp,
            output_dir: output.clone(),
            ..Default::default()
        };
        let report = run(
            config,
            &[source.path().to_path_buf()],
            &CancelToken::new(),
        );

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert!(output.join("tagged.bmp").exists());
    }

    #[test]
    fn pre_cancelled_batch_skips_every_item() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..5 {
            write_jpeg(temp_dir.child(format!("img_{i}.jpg")).path(), 16, 16);
        }

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            output_dir: output.clone(),
            ..Default::default()
        };

        let token = CancelToken::new();
        token.cancel();
        let report = run(config, &[temp_dir.path().to_path_buf()], &token);

        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 5);
        assert_eq!(count_files(&output), 0);
    }

    #[test]
    fn cancel_from_handle_stops_further_dispatch() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..20 {
            write_jpeg(temp_dir.child(format!("img_{i:02}.jpg")).path(), 64, 64);
        }

        let config = ProcessingConfig {
            output_dir: temp_dir.path().join("out"),
            workers: 2,
            ..Default::default()
        };
        let handle = BatchCoordinator::new(config)
            .unwrap()
            .spawn(vec![temp_dir.path().to_path_buf()]);
        handle.cancel();
        let report = handle.wait().unwrap();

        // In-flight items finish; the rest are skipped, not failed.
        assert!(report.cancelled);
        assert_eq!(report.processed + report.skipped, report.total);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn organize_and_prefix_shape_the_output_tree() {
        let temp_dir = TempDir::new().unwrap();
        write_jpeg(temp_dir.child("photo.jpg").path(), 16, 16);

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            format: TargetFormat::WebP,
            organize_by_format: true,
            rename_prefix: Some("small".to_string()),
            output_dir: output.clone(),
            ..Default::default()
        };
        let report = run(config, &[temp_dir.path().to_path_buf()], &CancelToken::new());

        assert_eq!(report.succeeded, 1);
        assert!(output.join("webp").join("small_photo.webp").exists());
    }

    #[test]
    fn adaptive_quality_batches_complete() {
        let temp_dir = TempDir::new().unwrap();
        write_jpeg(temp_dir.child("photo.jpg").path(), 128, 128);

        let output = temp_dir.path().join("out");
        let config = ProcessingConfig {
            quality: Quality::Adaptive,
            format: TargetFormat::Jpeg,
            output_dir: output.clone(),
            ..Default::default()
        };
        let report = run(config, &[temp_dir.path().to_path_buf()], &CancelToken::new());

        assert_eq!(report.succeeded, 1);
        assert!(report.bytes_after > 0);
        assert_eq!(count_files(&output), 1);
    }

    #[test]
    fn unsupported_explicit_path_becomes_a_warning() {
        let temp_dir = TempDir::new().unwrap();
        write_jpeg(temp_dir.child("photo.jpg").path(), 16, 16);
        let stray = temp_dir.child("notes.txt");
        stray.write_str("plain text").unwrap();

        let config = ProcessingConfig {
            output_dir: temp_dir.path().join("out"),
            ..Default::default()
        };
        let report = run(
            config,
            &[
                temp_dir.child("photo.jpg").path().to_path_buf(),
                stray.path().to_path_buf(),
            ],
            &CancelToken::new(),
        );

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, ErrorKind::Enumeration);
    }
}
