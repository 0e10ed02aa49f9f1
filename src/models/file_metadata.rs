//! Descriptive metadata recorded for every uploaded file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sidecar record describing one uploaded payload.
///
/// The record is stored on the storage network as its own object. It links to
/// the primary payload only through `cid`; nothing links back from the payload
/// to the record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Original filename as supplied by the uploader.
    pub name: String,

    /// Content identifier of the primary payload (never of this record).
    pub cid: String,

    /// Byte length declared by the uploader.
    pub size: u64,

    /// MIME type declared by the uploader.
    #[serde(rename = "type")]
    pub mime_type: String,

    /// Client-side timestamp taken when the record was built.
    pub uploaded_at: DateTime<Utc>,

    /// Reserved for identity binding. Always empty for now.
    pub owner: String,

    /// Reserved for categorization. Always empty for now.
    pub tags: Vec<String>,
}

/// Listing projection of [`FileMetadata`] shown in search results.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub name: String,
    pub cid: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FileMetadata> for SearchResult {
    fn from(meta: &FileMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            cid: meta.cid.clone(),
            size: meta.size,
            mime_type: meta.mime_type.clone(),
            uploaded_at: meta.uploaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> FileMetadata {
        FileMetadata {
            name: "report.pdf".into(),
            cid: "QmPrimary".into(),
            size: 42,
            mime_type: "application/pdf".into(),
            uploaded_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            owner: String::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["name"], "report.pdf");
        assert_eq!(value["cid"], "QmPrimary");
        assert_eq!(value["size"], 42);
        assert_eq!(value["type"], "application/pdf");
        assert_eq!(value["uploadedAt"], "2026-03-01T12:00:00Z");
        assert_eq!(value["owner"], "");
        assert_eq!(value["tags"], serde_json::json!([]));
        assert!(value.get("mime_type").is_none());
    }

    #[test]
    fn search_result_drops_owner_and_tags() {
        let meta = sample();
        let result = SearchResult::from(&meta);
        assert_eq!(result.cid, meta.cid);
        assert_eq!(result.uploaded_at, meta.uploaded_at);

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("owner").is_none());
        assert!(value.get("tags").is_none());
    }
}
