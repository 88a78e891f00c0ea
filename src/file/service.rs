//! File service.
//!
//! Combines the metadata repository, the blob store and the thumbnail
//! queue into the operations exposed over HTTP:
//! - Upload of folders, files and images
//! - Owner-scoped lookup, listing and visibility changes
//! - Content serving for owners and for public files

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{info, warn};

use super::metadata::{FileRecord, FileRepository, FileType, NewFile, ParentRef};
use super::storage::BlobStore;
use super::{DEFAULT_MAX_FILE_SIZE, PAGE_SIZE, THUMBNAIL_SIZES};
use crate::db::Database;
use crate::worker::{JobQueue, ThumbnailJob};
use crate::{Id, Result, ValidationError, VaultError};

/// Upload request, as received from the client.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub name: Option<String>,
    pub file_type: Option<String>,
    pub parent_id: ParentRef,
    pub is_public: bool,
    /// Base64 content; ignored for folders.
    pub data: Option<String>,
}

/// Content of a file ready to be served.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// File service.
#[derive(Clone)]
pub struct FileService {
    db: Database,
    blobs: BlobStore,
    thumbnails: JobQueue<ThumbnailJob>,
    max_file_size: usize,
}

fn not_found() -> VaultError {
    VaultError::NotFound("file".to_string())
}

impl FileService {
    pub fn new(db: Database, blobs: BlobStore, thumbnails: JobQueue<ThumbnailJob>) -> Self {
        Self {
            db,
            blobs,
            thumbnails,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the maximum decoded upload size in bytes.
    pub fn with_max_file_size(mut self, max_size: usize) -> Self {
        self.max_file_size = max_size;
        self
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Create a folder, file or image owned by `owner`.
    ///
    /// Checks run in order: name, type, data, parent. The blob is written
    /// before the record is inserted and removed again if the insert fails.
    /// Images get a thumbnail job once the record is stored.
    pub async fn upload(&self, owner: &Id, request: UploadRequest) -> Result<FileRecord> {
        let name = request
            .name
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::MissingName)?;
        let file_type = request
            .file_type
            .as_deref()
            .and_then(|t| t.parse::<FileType>().ok())
            .ok_or(ValidationError::InvalidType)?;
        let data = match file_type {
            FileType::Folder => None,
            _ => Some(
                request
                    .data
                    .filter(|data| !data.is_empty())
                    .ok_or(ValidationError::MissingData)?,
            ),
        };

        let repo = FileRepository::new(self.db.pool());
        if let ParentRef::Folder(parent_id) = &request.parent_id {
            let parent = repo
                .get_by_id(parent_id)
                .await?
                .ok_or(ValidationError::ParentNotFound)?;
            if !parent.is_folder() {
                return Err(ValidationError::ParentNotFolder.into());
            }
        }

        let mut new_file = NewFile::new(owner.clone(), name, file_type)
            .with_parent(request.parent_id)
            .with_public(request.is_public);

        let blob = match data {
            Some(data) => {
                let content = BASE64
                    .decode(data.trim())
                    .map_err(|_| ValidationError::InvalidData)?;
                if content.len() > self.max_file_size {
                    return Err(ValidationError::TooLarge.into());
                }
                let path = self.blobs.save(&content).await?;
                new_file = new_file.with_local_path(path.to_string_lossy());
                Some(path)
            }
            None => None,
        };

        let record = match repo.create(&new_file).await {
            Ok(record) => record,
            Err(e) => {
                if let Some(path) = &blob {
                    if let Err(cleanup) = self.blobs.delete(path).await {
                        warn!(path = ?path, error = %cleanup, "Failed to remove orphaned blob");
                    }
                }
                return Err(e);
            }
        };

        info!(
            file_id = %record.id,
            user_id = %owner,
            file_type = %record.file_type,
            "File created"
        );

        if record.file_type == FileType::Image {
            self.thumbnails
                .enqueue(ThumbnailJob::new(owner.clone(), record.id.clone()));
        }

        Ok(record)
    }

    /// Get a record owned by `requester`.
    pub async fn get(&self, requester: &Id, file_id: &Id) -> Result<FileRecord> {
        FileRepository::new(self.db.pool())
            .get_owned(file_id, requester)
            .await?
            .ok_or_else(not_found)
    }

    /// List one page of the requester's records under `parent`.
    pub async fn list(
        &self,
        requester: &Id,
        parent: &ParentRef,
        page: u64,
    ) -> Result<Vec<FileRecord>> {
        let offset = i64::try_from(page)
            .unwrap_or(i64::MAX)
            .saturating_mul(PAGE_SIZE);
        FileRepository::new(self.db.pool())
            .list_by_parent(requester, parent, offset, PAGE_SIZE)
            .await
    }

    /// Publish or unpublish an owned record.
    pub async fn set_visibility(
        &self,
        requester: &Id,
        file_id: &Id,
        is_public: bool,
    ) -> Result<FileRecord> {
        let record = FileRepository::new(self.db.pool())
            .set_public(file_id, requester, is_public)
            .await?
            .ok_or_else(not_found)?;

        info!(file_id = %file_id, is_public, "Visibility changed");
        Ok(record)
    }

    /// Read the content of a file or one of its thumbnails.
    ///
    /// Public files are readable by anyone, private files only by their
    /// owner. Everything else looks like a missing file.
    pub async fn read_content(
        &self,
        requester: Option<&Id>,
        file_id: &Id,
        size: Option<&str>,
    ) -> Result<FileContent> {
        let record = FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(not_found)?;

        if record.is_folder() {
            return Err(ValidationError::IsFolder.into());
        }

        let allowed = record.is_public || requester.is_some_and(|id| *id == record.user_id);
        if !allowed {
            return Err(not_found());
        }

        let blob = record
            .local_path
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(not_found)?;
        let path = match size {
            Some(raw) => {
                let size = parse_variant_size(raw).ok_or_else(not_found)?;
                let variant = BlobStore::variant_path(&blob, size);
                if !self.blobs.exists(&variant).await {
                    return Err(not_found());
                }
                variant
            }
            None => blob,
        };

        let data = self.blobs.load(&path).await?;
        let mime_type = mime_guess::from_path(&record.name)
            .first_or_octet_stream()
            .to_string();

        Ok(FileContent { data, mime_type })
    }
}

/// Accept only the generated thumbnail widths.
fn parse_variant_size(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|size| THUMBNAIL_SIZES.contains(size))
}

/// Parse a client-supplied page number; anything invalid is page 0.
pub fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|p| p.trim().parse::<u64>().ok()).unwrap_or(0)
}
