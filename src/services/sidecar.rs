//! Metadata sidecar writer.
//!
//! Turns an uploaded payload's descriptors into a [`FileMetadata`] record and
//! pushes the record to the storage network as its own object. The record's
//! identifier is dropped: the only link between the two objects is the `cid`
//! embedded in the record.

use crate::{
    models::{file_metadata::FileMetadata, payload::FilePayload},
    services::network::{NetworkError, NetworkResult, StorageNetwork},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Build the record for a payload that was stored under `cid`.
pub fn build_metadata(payload: &FilePayload, cid: &str, uploaded_at: DateTime<Utc>) -> FileMetadata {
    FileMetadata {
        name: payload.name.clone(),
        cid: cid.to_string(),
        size: payload.size,
        mime_type: payload.mime_type.clone(),
        uploaded_at,
        owner: String::new(),
        tags: Vec::new(),
    }
}

/// JSON encoding of the record as stored on the network.
pub fn encode_sidecar(metadata: &FileMetadata) -> NetworkResult<Bytes> {
    let buf = serde_json::to_vec(metadata).map_err(|err| NetworkError::Decode {
        endpoint: format!("sidecar for {}", metadata.cid),
        reason: err.to_string(),
    })?;
    Ok(Bytes::from(buf))
}

/// Push the encoded record. Its identifier is not returned.
pub async fn write_sidecar(network: &dyn StorageNetwork, metadata: &FileMetadata) -> NetworkResult<()> {
    let sidecar_cid = network.add(encode_sidecar(metadata)?).await?;
    tracing::debug!(cid = %metadata.cid, sidecar_cid = %sidecar_cid, "metadata sidecar stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemoryNetwork;
    use chrono::TimeZone;

    fn payload() -> FilePayload {
        FilePayload::new("notes.txt", "text/plain", Bytes::from_static(b"hello"))
    }

    #[test]
    fn record_copies_descriptors_and_leaves_reserved_fields_empty() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let meta = build_metadata(&payload().with_declared_size(999), "QmPrimary", at);
        assert_eq!(meta.name, "notes.txt");
        assert_eq!(meta.cid, "QmPrimary");
        assert_eq!(meta.size, 999);
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.uploaded_at, at);
        assert!(meta.owner.is_empty());
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn encoded_sidecar_decodes_back_to_the_record() {
        let meta = build_metadata(&payload(), "QmPrimary", Utc::now());
        let decoded: FileMetadata = serde_json::from_slice(&encode_sidecar(&meta).unwrap()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn unusual_descriptors_encode_cleanly() {
        let odd = FilePayload::new("r\u{e9}sum\u{e9} \"final\"\n.pdf", "", Bytes::new());
        let meta = build_metadata(&odd, "QmOdd", Utc::now());
        let encoded = encode_sidecar(&meta).expect("record encodes");
        let decoded: FileMetadata = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.name, meta.name);
    }

    #[tokio::test]
    async fn write_stores_a_second_object_holding_the_primary_cid() {
        let network = MemoryNetwork::new();
        let meta = build_metadata(&payload(), "QmPrimary", Utc::now());
        write_sidecar(&network, &meta).await.unwrap();

        assert_eq!(network.add_calls(), 1);
        let sidecar_cid = format!("m{:x}", md5::compute(encode_sidecar(&meta).unwrap()));
        let stored = network.get(&sidecar_cid).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(value["cid"], "QmPrimary");
    }
}
