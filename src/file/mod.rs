//! File management module for filevault.
//!
//! This module provides:
//! - File, image and folder metadata with a root/folder hierarchy
//! - Local blob storage with UUID naming
//! - The file service used by the HTTP handlers

mod metadata;
mod service;
mod storage;

pub use metadata::{FileRecord, FileRepository, FileType, NewFile, ParentRef};
pub use service::{parse_page, FileContent, FileService, UploadRequest};
pub use storage::BlobStore;

/// Records per listing page.
pub const PAGE_SIZE: i64 = 20;

/// Thumbnail widths in pixels, in generation order.
pub const THUMBNAIL_SIZES: &[u32] = &[500, 250, 100];

/// Default maximum decoded upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
