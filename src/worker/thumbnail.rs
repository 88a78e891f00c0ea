//! Thumbnail generation for uploaded images.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{JobError, JobHandler};
use crate::db::Database;
use crate::file::{BlobStore, FileRepository, THUMBNAIL_SIZES};
use crate::{Id, Result};

/// Queue name for thumbnail jobs.
pub const THUMBNAIL_QUEUE: &str = "thumbnails";

/// Request to derive thumbnails for one image record.
///
/// Both fields are optional so that malformed payloads can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailJob {
    pub user_id: Option<Id>,
    pub file_id: Option<Id>,
}

impl ThumbnailJob {
    pub fn new(user_id: Id, file_id: Id) -> Self {
        Self {
            user_id: Some(user_id),
            file_id: Some(file_id),
        }
    }
}

/// Writes the 500/250/100 px wide variants of an image beside the original.
pub struct ThumbnailWorker {
    db: Database,
}

impl ThumbnailWorker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobHandler for ThumbnailWorker {
    type Job = ThumbnailJob;

    async fn handle(&self, job: &ThumbnailJob) -> Result<()> {
        let file_id = job.file_id.as_ref().ok_or(JobError::MissingFileId)?;
        let user_id = job.user_id.as_ref().ok_or(JobError::MissingUserId)?;

        let record = FileRepository::new(self.db.pool())
            .get_owned(file_id, user_id)
            .await?
            .ok_or(JobError::FileNotFound)?;
        let source = record
            .local_path
            .map(PathBuf::from)
            .ok_or(JobError::FileNotFound)?;

        debug!(file_id = %file_id, source = ?source, "Generating thumbnails");

        let written = tokio::task::spawn_blocking(move || generate_thumbnails(&source))
            .await
            .map_err(|e| JobError::Aborted(e.to_string()))??;

        info!(file_id = %file_id, variants = written.len(), "Thumbnails written");
        Ok(())
    }
}

/// Height that keeps the aspect ratio at the given width.
fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width.max(1));
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Decode an image and write one resized copy per thumbnail width.
///
/// Variants are encoded in the source format, or as PNG when that format
/// has no encoder for the image. They are written in order, so a failure
/// leaves the earlier ones in place. Each variant is written to a temporary
/// sibling and renamed into place, so readers never see a partial file.
/// Blocking: call from a blocking thread.
pub fn generate_thumbnails(source: &Path) -> Result<Vec<PathBuf>> {
    let bytes = std::fs::read(source)?;
    let format = image::guess_format(&bytes)?;
    let image = image::load_from_memory_with_format(&bytes, format)?;

    let mut written = Vec::with_capacity(THUMBNAIL_SIZES.len());
    for &width in THUMBNAIL_SIZES {
        let height = scaled_height(image.width(), image.height(), width);
        let resized = image.resize_exact(width, height, FilterType::Triangle);

        let path = BlobStore::variant_path(source, width);
        write_atomic(&path, &encode_variant(&resized, format)?)?;
        written.push(path);
    }

    Ok(written)
}

fn encode_variant(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut encoded = Cursor::new(Vec::new());
    match image.write_to(&mut encoded, format) {
        Ok(()) => Ok(encoded.into_inner()),
        Err(ImageError::Unsupported(e)) => {
            debug!(?format, error = %e, "Encoding variant as PNG");
            let mut encoded = Cursor::new(Vec::new());
            image.write_to(&mut encoded, ImageFormat::Png)?;
            Ok(encoded.into_inner())
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to a unique temporary sibling, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = PathBuf::from(format!("{}.{}.tmp", path.display(), Uuid::new_v4()));
    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::file::{FileType, NewFile};
    use crate::VaultError;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 30, 30])));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(1000, 500, 500), 250);
        assert_eq!(scaled_height(1000, 500, 100), 50);
        assert_eq!(scaled_height(50, 50, 500), 500);
        assert_eq!(scaled_height(1000, 1, 100), 1);
    }

    #[test]
    fn test_generate_thumbnails_png() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("blob");
        write_png(&source, 1000, 500);

        let written = generate_thumbnails(&source).unwrap();
        assert_eq!(written.len(), 3);

        for (size, expected_height) in [(500, 250), (250, 125), (100, 50)] {
            let path = BlobStore::variant_path(&source, size);
            assert!(written.contains(&path));
            assert_eq!(image::image_dimensions(&path).unwrap(), (size, expected_height));
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        }
    }

    #[test]
    fn test_generate_thumbnails_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("blob");
        write_png(&source, 400, 400);

        generate_thumbnails(&source).unwrap();
        generate_thumbnails(&source).unwrap();

        let path = BlobStore::variant_path(&source, 250);
        assert_eq!(image::image_dimensions(&path).unwrap(), (250, 250));
    }

    fn leftover_temp_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[test]
    fn test_generate_thumbnails_gif() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("blob");
        let img = RgbaImage::from_pixel(200, 100, Rgba([10, 200, 10, 255]));
        img.save_with_format(&source, ImageFormat::Gif).unwrap();

        generate_thumbnails(&source).unwrap();

        for (size, expected_height) in [(500, 250), (250, 125), (100, 50)] {
            let path = BlobStore::variant_path(&source, size);
            assert_eq!(image::image_dimensions(&path).unwrap(), (size, expected_height));
        }
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_generate_thumbnails_other_formats() {
        for format in [ImageFormat::Bmp, ImageFormat::WebP, ImageFormat::Jpeg] {
            let temp_dir = TempDir::new().unwrap();
            let source = temp_dir.path().join("blob");
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([1, 2, 3])));
            img.save_with_format(&source, format).unwrap();

            generate_thumbnails(&source).unwrap();

            let path = BlobStore::variant_path(&source, 100);
            assert_eq!(
                image::image_dimensions(&path).unwrap(),
                (100, 100),
                "{format:?}"
            );
        }
    }

    #[test]
    fn test_encode_variant_falls_back_to_png() {
        // no TIFF encoder is compiled in
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 128])));

        let bytes = encode_variant(&img, ImageFormat::Tiff).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_rewrite_replaces_existing_variant() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("blob");
        write_png(&source, 400, 200);
        let path = BlobStore::variant_path(&source, 500);
        std::fs::write(&path, b"stale partial bytes").unwrap();

        generate_thumbnails(&source).unwrap();

        assert_eq!(image::image_dimensions(&path).unwrap(), (500, 250));
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_write_atomic_cleans_up_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("blob_500");
        // a directory cannot be replaced by a file
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        assert!(matches!(
            write_atomic(&target, b"data"),
            Err(VaultError::Io(_))
        ));
        assert!(target.join("keep").exists());
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_generate_thumbnails_not_an_image() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("blob");
        std::fs::write(&source, b"plain text").unwrap();

        let result = generate_thumbnails(&source);
        assert!(matches!(result, Err(VaultError::Image(_))));
        assert!(!BlobStore::variant_path(&source, 500).exists());
    }

    #[tokio::test]
    async fn test_handle_missing_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let worker = ThumbnailWorker::new(db);

        let missing_file = ThumbnailJob {
            user_id: Some(Id::from("u")),
            file_id: None,
        };
        assert!(matches!(
            worker.handle(&missing_file).await,
            Err(VaultError::Job(JobError::MissingFileId))
        ));

        let missing_user = ThumbnailJob {
            user_id: None,
            file_id: Some(Id::from("f")),
        };
        assert!(matches!(
            worker.handle(&missing_user).await,
            Err(VaultError::Job(JobError::MissingUserId))
        ));

        let unknown = ThumbnailJob::new(Id::from("u"), Id::from("f"));
        assert!(matches!(
            worker.handle(&unknown).await,
            Err(VaultError::Job(JobError::FileNotFound))
        ));
    }

    #[tokio::test]
    async fn test_handle_writes_variants() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("img@example.com", "hash"))
            .await
            .unwrap();

        let source = temp_dir.path().join("blob");
        write_png(&source, 600, 300);
        let record = FileRepository::new(db.pool())
            .create(
                &NewFile::new(user.id.clone(), "pic.png", FileType::Image)
                    .with_local_path(source.to_string_lossy()),
            )
            .await
            .unwrap();

        let worker = ThumbnailWorker::new(db);

        // wrong owner is treated as a missing file
        let foreign = ThumbnailJob::new(Id::from("intruder"), record.id.clone());
        assert!(matches!(
            worker.handle(&foreign).await,
            Err(VaultError::Job(JobError::FileNotFound))
        ));

        worker
            .handle(&ThumbnailJob::new(user.id, record.id))
            .await
            .unwrap();
        for size in THUMBNAIL_SIZES {
            assert!(BlobStore::variant_path(&source, *size).exists());
        }
    }

    #[test]
    fn test_job_wire_format() {
        let job = ThumbnailJob::new(Id::from("u1"), Id::from("f1"));
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            serde_json::json!({ "userId": "u1", "fileId": "f1" })
        );

        let parsed: ThumbnailJob = serde_json::from_str(r#"{"fileId":"f1"}"#).unwrap();
        assert_eq!(parsed.user_id, None);
    }
}
