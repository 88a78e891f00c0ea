//! File metadata types and repository.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use crate::{Id, Result, VaultError};

/// Kind of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Folder,
    File,
    Image,
}

impl FileType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "folder" => Ok(FileType::Folder),
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            _ => Err(format!("unknown file type: {s}")),
        }
    }
}

/// Parent of a file record: the root, or a folder.
///
/// On the wire the root is the number `0`. Inputs of `0`, `"0"`, `""` and
/// `null` all mean root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentRef {
    #[default]
    Root,
    Folder(Id),
}

impl ParentRef {
    /// Database value of the root.
    pub const ROOT: &'static str = "0";

    /// Parse a client-supplied parent id.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | Self::ROOT => ParentRef::Root,
            id => ParentRef::Folder(Id::from(id)),
        }
    }

    /// Value stored in the `parent_id` column.
    pub fn as_db_value(&self) -> &str {
        match self {
            ParentRef::Root => Self::ROOT,
            ParentRef::Folder(id) => id.as_str(),
        }
    }
}

impl Serialize for ParentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ParentRef::Root => serializer.serialize_u8(0),
            ParentRef::Folder(id) => serializer.serialize_str(id.as_str()),
        }
    }
}

struct ParentRefVisitor;

impl<'de> Visitor<'de> for ParentRefVisitor {
    type Value = ParentRef;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a folder id, 0, or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ParentRef, E> {
        Ok(ParentRef::parse(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ParentRef, E> {
        Ok(ParentRef::parse(&v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ParentRef, E> {
        Ok(ParentRef::parse(&v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<ParentRef, E> {
        Ok(ParentRef::Root)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<ParentRef, E> {
        Ok(ParentRef::Root)
    }
}

impl<'de> Deserialize<'de> for ParentRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ParentRefVisitor)
    }
}

/// A stored file, image or folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: Id,
    /// Owner.
    pub user_id: Id,
    /// Display name.
    pub name: String,
    pub file_type: FileType,
    pub parent_id: ParentRef,
    pub is_public: bool,
    /// Blob path, absent for folders.
    pub local_path: Option<String>,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }
}

impl FromRow<'_, SqliteRow> for FileRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let file_type: String = row.try_get("type")?;
        let file_type = file_type
            .parse::<FileType>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let parent_id: String = row.try_get("parent_id")?;

        Ok(Self {
            id: Id::from(row.try_get::<String, _>("id")?),
            user_id: Id::from(row.try_get::<String, _>("user_id")?),
            name: row.try_get("name")?,
            file_type,
            parent_id: ParentRef::parse(&parent_id),
            is_public: row.try_get("is_public")?,
            local_path: row.try_get("local_path")?,
        })
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub user_id: Id,
    pub name: String,
    pub file_type: FileType,
    pub parent_id: ParentRef,
    pub is_public: bool,
    pub local_path: Option<String>,
}

impl NewFile {
    /// Create a private record at the root.
    pub fn new(user_id: Id, name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            user_id,
            name: name.into(),
            file_type,
            parent_id: ParentRef::Root,
            is_public: false,
            local_path: None,
        }
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent_id: ParentRef) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Set the blob path.
    pub fn with_local_path(mut self, local_path: impl Into<String>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }
}

const SELECT_FILES: &str =
    "SELECT id, user_id, name, type, parent_id, is_public, local_path FROM files";

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record under a fresh id.
    pub async fn create(&self, file: &NewFile) -> Result<FileRecord> {
        let id = Id::generate();

        sqlx::query(
            "INSERT INTO files (id, user_id, name, type, parent_id, is_public, local_path)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(file.user_id.as_str())
        .bind(&file.name)
        .bind(file.file_type.as_str())
        .bind(file.parent_id.as_db_value())
        .bind(file.is_public)
        .bind(&file.local_path)
        .execute(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))
    }

    /// Get a record by id, regardless of owner.
    pub async fn get_by_id(&self, id: &Id) -> Result<Option<FileRecord>> {
        let sql = format!("{SELECT_FILES} WHERE id = ?");
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Get a record by id only if it belongs to `owner`.
    pub async fn get_owned(&self, id: &Id, owner: &Id) -> Result<Option<FileRecord>> {
        let sql = format!("{SELECT_FILES} WHERE id = ? AND user_id = ?");
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id.as_str())
            .bind(owner.as_str())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(file)
    }

    /// List an owner's records under a parent in insertion order.
    pub async fn list_by_parent(
        &self,
        owner: &Id,
        parent: &ParentRef,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let sql = format!("{SELECT_FILES} WHERE user_id = ? AND parent_id = ? ORDER BY seq LIMIT ? OFFSET ?");
        let files = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(owner.as_str())
            .bind(parent.as_db_value())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Set the visibility of an owned record.
    ///
    /// Returns the updated record, or None if no record matched.
    pub async fn set_public(
        &self,
        id: &Id,
        owner: &Id,
        is_public: bool,
    ) -> Result<Option<FileRecord>> {
        let result = sqlx::query("UPDATE files SET is_public = ? WHERE id = ? AND user_id = ?")
            .bind(is_public)
            .bind(id.as_str())
            .bind(owner.as_str())
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Count all records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(count)
    }
}
