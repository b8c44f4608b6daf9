//! Client side of the global library service.

mod http;

pub use http::HttpGlobalClient;

use async_trait::async_trait;
use library_core::{Family, FileDescriptor};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Read-only view of the global library.
#[async_trait]
pub trait GlobalSource: Send + Sync {
    /// Full snapshot of one family's collection, undecoded.
    async fn fetch_collection(&self, family: Family) -> Result<serde_json::Value>;

    /// Descriptors for the given file ids; ids unknown upstream are omitted.
    async fn lookup_files(&self, ids: &[i64]) -> Result<Vec<FileDescriptor>>;

    /// Raw bytes of one file.
    async fn download_file(&self, id: i64) -> Result<Vec<u8>>;
}

/// Collections arrive either bare or wrapped in `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Envelope<T> {
    fn into_inner(self) -> Vec<T> {
        match self {
            Envelope::Bare(items) => items,
            Envelope::Wrapped { data } => data,
        }
    }
}

/// Decode a collection payload into typed records.
///
/// Any record failing to decode rejects the whole payload.
pub fn decode_collection<T: DeserializeOwned>(value: serde_json::Value) -> Result<Vec<T>> {
    serde_json::from_value::<Envelope<T>>(value)
        .map(Envelope::into_inner)
        .map_err(|e| SyncError::Parse(e.to_string()))
}

/// Fetch and decode one family's collection.
pub async fn fetch_records<T: DeserializeOwned>(
    source: &dyn GlobalSource,
    family: Family,
) -> Result<Vec<T>> {
    let payload = source.fetch_collection(family).await?;
    decode_collection(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::records::GlobalLanguage;
    use serde_json::json;

    #[test]
    fn test_decode_bare_array() {
        let records: Vec<GlobalLanguage> =
            decode_collection(json!([{"id": 1, "name": "English", "code": "en"}])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "en");
    }

    #[test]
    fn test_decode_wrapped_array() {
        let records: Vec<GlobalLanguage> = decode_collection(json!({
            "data": [{"id": 1, "name": "English", "code": "en"},
                     {"id": 2, "name": "Khmer", "code": "km"}]
        }))
        .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_malformed_record_rejects_payload() {
        let result: Result<Vec<GlobalLanguage>> =
            decode_collection(json!([{"id": 1, "name": "English", "code": "en"}, {"name": "?"}]));
        assert!(matches!(result, Err(SyncError::Parse(_))));
    }
}
