use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, BoolFromInt, TimestampSeconds};
use time::OffsetDateTime;

/// A note as mirrored in memory.
///
/// `is_dirty` is client-only state: true whenever the local title/body differ
/// from the last content the store confirmed. It never crosses the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Optional external-export target, independent of the primary
    /// persistence path owned by the backend.
    pub file_path: Option<PathBuf>,
    pub is_dirty: bool,
    pub is_deleted: bool,
}

/// Wire shape exchanged with the backend: snake_case fields, unix-second
/// timestamps, and the store's 0/1 deleted flag.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDto {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub created_at: OffsetDateTime,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub updated_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde_as(as = "Option<BoolFromInt>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl From<NoteDto> for NoteRecord {
    fn from(dto: NoteDto) -> Self {
        let file_path = dto
            .file_path
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        Self {
            id: dto.id,
            title: dto.title,
            body: dto.body,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            file_path,
            is_dirty: false,
            is_deleted: dto.is_deleted.unwrap_or(false),
        }
    }
}

impl From<&NoteRecord> for NoteDto {
    fn from(record: &NoteRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            body: record.body.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            file_path: record
                .file_path
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned()),
            is_deleted: record.is_deleted.then_some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_trashed_store_row() {
        let raw = r#"{
            "id": "a1b2",
            "title": "Groceries",
            "body": "milk",
            "created_at": 1700000000,
            "updated_at": 1700000600,
            "file_path": "",
            "is_deleted": 1
        }"#;
        let dto: NoteDto = serde_json::from_str(raw).expect("parsing note dto");
        let record = NoteRecord::from(dto);
        assert!(record.is_deleted);
        assert!(!record.is_dirty);
        assert_eq!(record.file_path, None);
        assert_eq!(record.created_at.unix_timestamp(), 1_700_000_000);
        assert_eq!(record.updated_at.unix_timestamp(), 1_700_000_600);
    }

    #[test]
    fn missing_flags_default_to_a_live_record() {
        let raw = r#"{
            "id": "a1b2",
            "title": "Groceries",
            "body": "milk",
            "created_at": 1700000000,
            "updated_at": 1700000000
        }"#;
        let record: NoteRecord = serde_json::from_str::<NoteDto>(raw)
            .expect("parsing note dto")
            .into();
        assert!(!record.is_deleted);
        assert_eq!(record.file_path, None);
    }

    #[test]
    fn serializes_timestamps_as_unix_seconds() {
        let record = NoteRecord {
            id: "a1b2".into(),
            title: "Groceries".into(),
            body: "milk".into(),
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            updated_at: OffsetDateTime::from_unix_timestamp(1_700_000_600).unwrap(),
            file_path: Some(PathBuf::from("/tmp/groceries.md")),
            is_dirty: true,
            is_deleted: false,
        };
        let value = serde_json::to_value(NoteDto::from(&record)).expect("serialising note dto");
        assert_eq!(value["created_at"], 1_700_000_000);
        assert_eq!(value["updated_at"], 1_700_000_600);
        assert_eq!(value["file_path"], "/tmp/groceries.md");
        // live records omit the flag entirely, matching the store's rows
        assert!(value.get("is_deleted").is_none());
    }
}
