use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Raw image bytes. Cloning shares the buffer; the contents never change after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPayload(Bytes);

impl PhotoPayload {
    pub fn new(bytes: Bytes) -> Result<Self, String> {
        if bytes.is_empty() {
            return Err("Photo payload cannot be empty".to_string());
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex-encoded SHA-256 of the image bytes.
    pub fn checksum(&self) -> String {
        let digest = Sha256::digest(&self.0);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn into_inner(self) -> Bytes {
        self.0
    }
}

impl From<PhotoPayload> for Bytes {
    fn from(payload: PhotoPayload) -> Self {
        payload.0
    }
}
