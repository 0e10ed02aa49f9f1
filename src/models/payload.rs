//! A file handed to the client for upload.

use bytes::Bytes;

/// Raw payload plus the descriptors the uploader declared for it.
///
/// `size` is whatever the uploader reported and is copied into the
/// metadata record as-is; it is not checked against `bytes.len()`.
#[derive(Clone, Debug)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub bytes: Bytes,
}

impl FilePayload {
    /// Build a payload whose declared size is the byte length.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Override the declared size.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}
